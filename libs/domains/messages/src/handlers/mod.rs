mod api;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::models::{CreatedMessage, HelloResponse};
use crate::repository::MessageRepository;
use crate::service::MessageService;

pub use api::{create_message, hello};

/// OpenAPI documentation for the messages API
#[derive(OpenApi)]
#[openapi(
    paths(api::hello, api::create_message),
    components(schemas(HelloResponse, CreatedMessage)),
    tags((name = "messages", description = "Messages stored in PostgreSQL"))
)]
pub struct MessagesApiDoc;

/// Routes relative to the `/api` prefix
pub fn router<R: MessageRepository + 'static>(service: MessageService<R>) -> Router {
    Router::new()
        .route("/hello", get(api::hello::<R>))
        .route("/message", post(api::create_message::<R>))
        .with_state(Arc::new(service))
}

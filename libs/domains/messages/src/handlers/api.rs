use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;

use crate::error::MessageResult;
use crate::models::{CreateMessageQuery, CreatedMessage, HelloResponse};
use crate::repository::MessageRepository;
use crate::service::MessageService;

/// Latest message from the database
#[utoipa::path(
    get,
    path = "/hello",
    tag = "messages",
    responses(
        (status = 200, description = "Latest message, or a placeholder when the table is empty", body = HelloResponse),
        (status = 500, description = "Database error", body = axum_helpers::ErrorResponse)
    )
)]
pub async fn hello<R: MessageRepository>(
    State(service): State<Arc<MessageService<R>>>,
) -> MessageResult<Json<HelloResponse>> {
    let latest = service.latest().await?;
    Ok(Json(latest.into()))
}

/// Store a new message
#[utoipa::path(
    post,
    path = "/message",
    tag = "messages",
    params(CreateMessageQuery),
    responses(
        (status = 200, description = "Message stored", body = CreatedMessage),
        (status = 500, description = "Database error", body = axum_helpers::ErrorResponse)
    )
)]
pub async fn create_message<R: MessageRepository>(
    State(service): State<Arc<MessageService<R>>>,
    Query(query): Query<CreateMessageQuery>,
) -> MessageResult<Json<CreatedMessage>> {
    let message = service.create(query.content_or_default()).await?;
    Ok(Json(message.into()))
}

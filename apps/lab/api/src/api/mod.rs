use axum::{Router, routing::get};
use domain_messages::MessageRepository;

use crate::state::AppState;

pub mod jobs;
pub mod root;
pub mod status;

/// `/`, `/job` and everything under `/api`.
///
/// Returns a stateless Router: every sub-router has its state applied.
pub fn routes<R: MessageRepository + 'static>(state: AppState<R>) -> Router {
    let api = domain_messages::router(state.messages.clone()).merge(status::router(state.messages));

    Router::new()
        .route("/", get(root::root))
        .merge(jobs::router(state.producer))
        .nest("/api", api)
}

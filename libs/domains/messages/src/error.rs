use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Database error: {0}")]
    Database(String),
}

pub type MessageResult<T> = Result<T, MessageError>;

/// Surfaces as 500 `{"message": "Database error: ..."}`
impl From<MessageError> for AppError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for MessageError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<sea_orm::DbErr> for MessageError {
    fn from(err: sea_orm::DbErr) -> Self {
        MessageError::Database(err.to_string())
    }
}

impl From<database::DatabaseError> for MessageError {
    fn from(err: database::DatabaseError) -> Self {
        MessageError::Database(err.to_string())
    }
}

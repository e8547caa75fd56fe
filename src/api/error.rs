use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::repository::TaskError;

use super::auth::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("{0}")]
    InvalidBody(String),

    #[error("Todo not found")]
    UnknownId(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownId(_) => StatusCode::NOT_FOUND,
            ApiError::Task(TaskError::Validation(_) | TaskError::InvalidField(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Task(TaskError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Task(TaskError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            log::error!("Request failed: {}", self);
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

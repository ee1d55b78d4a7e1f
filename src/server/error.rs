use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };
use thiserror::Error;

use crate::llm::chat::ProviderError;
use crate::models::ChatResponse;

pub const INVALID_MESSAGES: &str = "messages[] is required";

/// Terminal outcome of a `/chat` request other than success. Nothing is retried.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0} is missing")]
    MissingCredential(&'static str),
    #[error("{}", INVALID_MESSAGES)]
    InvalidMessages,
    #[error("unauthorized")]
    Unauthorized,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("{}", .0.public_message())]
    Provider(#[from] ProviderError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingCredential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::InvalidMessages => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RelayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(ChatResponse::error(self.to_string()))).into_response()
    }
}

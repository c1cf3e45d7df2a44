//! Error types for the relay

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use imb_payload::DecodeError;
use serde_json::json;
use thiserror::Error;

use crate::sink::SinkError;

/// Errors that end an ingress request
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("unauthorized")]
    Unauthorized,

    /// Body was not a JSON uplink request
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("missing payload")]
    MissingPayload,

    /// Named field was not valid hex of the expected length
    #[error("invalid hex in {0}")]
    InvalidHex(&'static str),

    /// Tagged decoder error; the empty-error outcome never reaches here
    #[error("decode failed: {0}")]
    Decode(DecodeError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::InvalidBody(JsonRejection::MissingJsonContentType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            RelayError::InvalidBody(_)
            | RelayError::MissingPayload
            | RelayError::InvalidHex(_) => StatusCode::BAD_REQUEST,
            RelayError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::Sink(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn messages(&self) -> Vec<String> {
        match self {
            RelayError::Decode(err) => err.messages().into_iter().map(String::from).collect(),
            other => vec![other.to_string()],
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "errors": self.messages() }))).into_response()
    }
}

//! Response envelopes
//!
//! Every gateway request ends in exactly one [`Envelope`]:
//!
//! | outcome    | status | body                  |
//! |------------|--------|-----------------------|
//! | success    | 200    | `{ message, data }`   |
//! | validation | 400    | `{ error }`           |
//! | upstream   | 500    | `{ error, details }`  |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use super::validation::ValidationError;

/// Success body
#[derive(Debug, Serialize)]
pub struct SuccessBody {
    /// Human-readable success line
    pub message: String,
    /// Upstream result, untouched
    pub data: Value,
}

/// Failure body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Description of what failed
    pub error: String,
    /// Underlying cause, for upstream failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Outcome of one gateway request
#[derive(Debug)]
pub enum Envelope {
    /// Upstream call succeeded
    Success(SuccessBody),
    /// Request rejected before any upstream call
    Invalid(ValidationError),
    /// Credential exchange or upstream operation failed
    Failed(ErrorBody),
}

impl Envelope {
    /// Success envelope
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self::Success(SuccessBody {
            message: message.into(),
            data,
        })
    }

    /// Upstream failure envelope
    pub fn failed(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Failed(ErrorBody {
            error: error.into(),
            details: Some(details.into()),
        })
    }

    /// HTTP status of this envelope
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for Envelope {
    fn from(err: ValidationError) -> Self {
        Self::Invalid(err)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Success(body) => (status, Json(body)).into_response(),
            Self::Invalid(err) => (
                status,
                Json(ErrorBody {
                    error: err.message,
                    details: None,
                }),
            )
                .into_response(),
            Self::Failed(body) => (status, Json(body)).into_response(),
        }
    }
}

//! Response envelope shared by every served operation

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::release::error::{ClassifiedError, ErrorCode};
use crate::release::types::{Provenance, SnapshotRead};

/// `{ result, error_code, message }`, plus provenance and upstream detail when relevant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub result: Value,
    pub error_code: Option<ErrorCode>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Provenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ErrorDetail>,
}

/// Upstream failure behind a 503, or the soft error riding along a 404
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub upstream_status: Option<u16>,
    pub error_code: ErrorCode,
    pub message: String,
}

impl From<&ClassifiedError> for ErrorDetail {
    fn from(error: &ClassifiedError) -> Self {
        Self {
            upstream_status: error.status,
            error_code: error.code,
            message: error.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Envelope,
}

impl ApiResponse {
    /// 200 with data derived from `read`; a soft upstream error rides along
    pub fn ok(result: impl Serialize, read: &SnapshotRead) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                result: serde_json::to_value(result).unwrap_or_else(|e| {
                    error!("Failed to serialize response result: {}", e);
                    Value::Null
                }),
                error_code: read.error.as_ref().map(|e| e.code),
                message: read.error.as_ref().map(|e| e.message.clone()),
                source: Some(read.source),
                detail: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::failure(
            StatusCode::BAD_REQUEST,
            ErrorCode::ValidationError,
            message.into(),
        )
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::failure(StatusCode::UNAUTHORIZED, ErrorCode::AuthError, message.into())
    }

    pub fn not_found(message: impl Into<String>, read: &SnapshotRead) -> Self {
        let mut response = Self::failure(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFoundError,
            message.into(),
        );
        response.body.source = Some(read.source);
        response.body.detail = read.error.as_ref().map(ErrorDetail::from);
        response
    }

    /// 503 when nothing is servable and no stale snapshot exists
    pub fn unavailable(error: &ClassifiedError) -> Self {
        let mut response = Self::failure(
            StatusCode::SERVICE_UNAVAILABLE,
            error.code,
            format!("No release data available: {}", error.message),
        );
        response.body.detail = Some(ErrorDetail::from(error));
        response
    }

    fn failure(status: StatusCode, code: ErrorCode, message: String) -> Self {
        Self {
            status,
            body: Envelope {
                result: Value::Null,
                error_code: Some(code),
                message: Some(message),
                source: None,
                detail: None,
            },
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "status": self.status.as_u16(),
            "body": self.body,
        })
    }
}

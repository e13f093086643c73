use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::IntoResponse,
};
use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{error, warn};

use crate::crypto::CryptoError;
use crate::middleware::request_id::current_request_id;

#[derive(Debug, ThisError)]
pub enum BridgeError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    MissingSession,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: Insufficient permissions")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Too many requests, please try again later.")]
    RateLimited { retry_after_secs: u64 },

    /// ERPNext answered, but refused the operation.
    #[error("{message}")]
    Erp { status: StatusCode, message: String },

    #[error("{0}")]
    ConnectionTest(String),

    #[error("Failed to communicate with ERPNext server: {0}")]
    ErpTransport(#[from] reqwest::Error),

    #[error("Failed to initialize ERPNext client - invalid credentials")]
    ErpClientInit,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Failed to generate upload URL: {0}")]
    Upload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn erp(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Erp {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ConnectionTest(_) => StatusCode::BAD_REQUEST,
            Self::MissingSession | Self::InvalidSession | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Erp { status, .. } => *status,
            Self::ErpTransport(_)
            | Self::ErpClientInit
            | Self::Crypto(_)
            | Self::Database(_)
            | Self::Token(_)
            | Self::PasswordHash(_)
            | Self::Json(_)
            | Self::UrlParse(_)
            | Self::Upload(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for BridgeError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let request_id = current_request_id().map(|id| id.to_string());

        if status.is_server_error() {
            error!(
                request_id = request_id.as_deref().unwrap_or("-"),
                error = %self,
                "Unhandled error occurred"
            );
        } else {
            warn!(
                request_id = request_id.as_deref().unwrap_or("-"),
                status = status.as_u16(),
                error = %self,
                "request rejected"
            );
        }

        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let retry_after = match &self {
            Self::RateLimited { retry_after_secs } => {
                HeaderValue::from_str(&retry_after_secs.to_string()).ok()
            }
            _ => None,
        };

        let mut resp = (status, Json(ApiErrorBody { message, request_id })).into_response();
        if let Some(value) = retry_after {
            resp.headers_mut().insert(RETRY_AFTER, value);
        }
        resp
    }
}

/// Error envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

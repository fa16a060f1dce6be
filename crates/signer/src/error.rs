use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::signing::{Envelope, KeyStoreError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("error retrieving certificate: {0}")]
    Certificate(KeyStoreError),
    #[error("error signing data: {0}")]
    Sign(KeyStoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("origin not allowed")]
    TrustRejected,
}

impl OracleError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Certificate(KeyStoreError::CertificateNotFound) => {
                (StatusCode::NOT_FOUND, "Certificate not found".to_string())
            }
            Self::Certificate(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error retrieving certificate".to_string(),
            ),
            Self::Sign(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error signing data".to_string(),
            ),
            Self::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "The data field is too large.".to_string(),
            ),
            Self::TrustRejected => (StatusCode::FORBIDDEN, "Origin not allowed".to_string()),
        }
    }
}

/// Converts the error into an envelope response. This is the one place
/// oracle failures are logged; the wire message never includes the
/// underlying key store detail.
impl IntoResponse for OracleError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "request refused");
        }
        (status, Json(Envelope::failure(message))).into_response()
    }
}

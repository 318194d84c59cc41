use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::codec::CodecError;
use crate::deploy::DeployError;
use crate::kms::KmsError;

#[derive(Debug, thiserror::Error)]
pub enum SignerServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Invalid deploy: {0}")]
    Deploy(#[from] DeployError),
    #[error("No key registered for public key {0}")]
    UnknownKey(String),
    #[error("Key management service error: {0}")]
    Kms(KmsError),
    #[error("Failed to convert key management service output: {0}")]
    Codec(#[from] CodecError),
}

impl From<KmsError> for SignerServerError {
    fn from(error: KmsError) -> Self {
        match error {
            KmsError::NotFound(key) => Self::UnknownKey(key),
            other => Self::Kms(other),
        }
    }
}

/// Trait implementation to convert this error into an axum http response
impl IntoResponse for SignerServerError {
    fn into_response(self) -> Response {
        match self {
            bad_request @ (SignerServerError::BadRequest(_) | SignerServerError::Deploy(_)) => {
                (StatusCode::BAD_REQUEST, bad_request.to_string()).into_response()
            }
            unknown_key @ SignerServerError::UnknownKey(_) => {
                (StatusCode::NOT_FOUND, unknown_key.to_string()).into_response()
            }
            kms @ SignerServerError::Kms(_) => {
                (StatusCode::BAD_GATEWAY, kms.to_string()).into_response()
            }
            codec @ SignerServerError::Codec(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, codec.to_string()).into_response()
            }
        }
    }
}

//! Mapping of domain errors onto HTTP responses.

use api_shared::{AuthError, ErrorRes};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use consult_core::{ConsultError, ValidationError};
use consult_files::FilesError;
use consult_uuid::UuidError;

/// Error returned by every handler.
///
/// The body is always an [`ErrorRes`] so clients can surface `message` directly.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(AuthError),
    BadRequest(String),
    Consult(ConsultError),
}

impl From<ConsultError> for ApiError {
    fn from(err: ConsultError) -> Self {
        ApiError::Consult(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Consult(err.into())
    }
}

impl From<UuidError> for ApiError {
    fn from(err: UuidError) -> Self {
        ApiError::Consult(err.into())
    }
}

impl From<FilesError> for ApiError {
    fn from(err: FilesError) -> Self {
        ApiError::Consult(err.into())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Consult(err) => match err {
                ConsultError::Validation(v) => (StatusCode::BAD_REQUEST, v.to_string()),
                ConsultError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                ConsultError::AuthExpired => (StatusCode::UNAUTHORIZED, err.to_string()),
                ConsultError::SubmissionInProgress => (StatusCode::CONFLICT, err.to_string()),
                ConsultError::Collaborator { status, detail } => {
                    let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                    if status.is_server_error() {
                        tracing::error!("Internal error: {}", detail);
                        (status, "Internal error".into())
                    } else {
                        (status, detail.clone())
                    }
                }
                ConsultError::Io(_) | ConsultError::Serialization(_) => {
                    tracing::error!("Internal error: {:?}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorRes::new(message))).into_response()
    }
}

use consult_files::{FilesError, Rejection};

/// Input problems caught before any collaborator is contacted.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("a reason for the consultation is required")]
    BlankReason,
    #[error("attachment rejected: {}", describe(.0))]
    Attachment(Vec<Rejection>),
    #[error("unknown review field '{0}' (expected 'prescription' or 'order')")]
    UnknownReviewField(String),
    #[error("nothing to review: the {0} field is empty")]
    NothingToReview(crate::review::ReviewField),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

fn describe(rejections: &[Rejection]) -> String {
    rejections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum ConsultError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("collaborator request failed ({status}): {detail}")]
    Collaborator { status: u16, detail: String },
    /// The bearer credential was refused; the session must be cleared.
    #[error("session expired or unauthorised")]
    AuthExpired,
    #[error("not found: {0}")]
    NotFound(String),
    /// Another submission from the same control is still in flight.
    #[error("a submission is already in progress")]
    SubmissionInProgress,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialise record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConsultError {
    /// True for errors caught before any collaborator call.
    pub fn is_validation(&self) -> bool {
        matches!(self, ConsultError::Validation(_))
    }
}

impl From<FilesError> for ConsultError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::Rejected(rejections) => {
                ConsultError::Validation(ValidationError::Attachment(rejections))
            }
            FilesError::InvalidFilename(name) => {
                ConsultError::Validation(ValidationError::InvalidIdentifier(name))
            }
            FilesError::NotFound(name) => ConsultError::NotFound(name),
            FilesError::Io(e) => ConsultError::Io(e),
            other => ConsultError::Collaborator {
                status: 500,
                detail: other.to_string(),
            },
        }
    }
}

impl From<consult_uuid::UuidError> for ConsultError {
    fn from(err: consult_uuid::UuidError) -> Self {
        ConsultError::Validation(ValidationError::InvalidIdentifier(err.to_string()))
    }
}

pub type ConsultResult<T> = std::result::Result<T, ConsultError>;

//! Consultation Attachments
//!
//! This crate validates, stores and describes files attached to a consultation.
//!
//! ## Design Principles
//!
//! - Attachments are created once at upload time and never mutated, only referenced
//! - Storage addressing never uses the original filename: every upload receives an opaque
//!   [`StoredName`] (`<uuid>.<ext>`), which rules out collisions and path traversal
//! - The original filename, MIME type, size, digest and upload time are recorded in an
//!   [`Attachment`] that is written as a YAML sidecar next to the bytes
//! - Validation (size, extension, batch count) happens before any byte is written
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//! └── attachments/
//!     └── 55/                                      # first two hex chars of the uuid
//!         ├── 550e8400e29b41d4a716446655440000.pdf
//!         └── 550e8400e29b41d4a716446655440000.pdf.yaml
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use consult_files::{AttachmentPolicy, FilesService, UploadFile};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FilesService::new(Path::new("consult_data"))?;
//! let file = UploadFile::new("lab-results.pdf", std::fs::read("lab-results.pdf")?)?;
//! let attachment = service.store(&AttachmentPolicy::default(), &file)?;
//! println!("stored {} as {}", attachment.original_name, attachment.stored_name);
//! # Ok(())
//! # }
//! ```

mod constants;
mod content_type;
mod files;
mod pending;
mod validation;

pub use constants::{
    ALLOWED_EXTENSIONS, ATTACHMENTS_FOLDER_NAME, DOWNLOAD_ROUTE_PREFIX, MAX_BATCH_FILES,
    MAX_FILE_SIZE_BYTES,
};
pub use content_type::{format_file_size, resolve_content_type, GENERIC_BINARY_TYPE};
pub use files::{download_url, Attachment, FilesService};
pub use pending::PendingBatch;
pub use validation::{AttachmentPolicy, Rejection, RejectionReason, UploadFile};
pub use consult_uuid::StoredName;

/// Errors that can occur during attachment operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Data directory does not exist or is not a directory
    #[error("Invalid data directory: {0}")]
    InvalidRootDirectory(String),

    /// Upload name is blank once directory components are removed
    #[error("Invalid filename: '{0}'")]
    InvalidFilename(String),

    /// The file (or batch) failed validation; nothing was written
    #[error("Attachment rejected: {}", describe_rejections(.0))]
    Rejected(Vec<Rejection>),

    /// No attachment is stored under the given name
    #[error("Attachment not found: {0}")]
    NotFound(String),

    /// Stored metadata could not be read or written
    #[error("Attachment metadata error: {0}")]
    Metadata(#[from] serde_yaml::Error),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Identifier error from the consult-uuid crate
    #[error("Identifier error: {0}")]
    Uuid(#[from] consult_uuid::UuidError),
}

fn describe_rejections(rejections: &[Rejection]) -> String {
    rejections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

//! Canonical identifiers and opaque storage names.
//!
//! Patients and consultations are addressed by a *canonical* UUID representation:
//! **32 lowercase hexadecimal characters** (no hyphens). The same value is used to derive a
//! sharded directory for a patient's consultation documents:
//!
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Uploaded attachments are never addressed by the filename the user chose. Each one receives a
//! [`StoredName`] of the form `<canonical-uuid>.<extension>`, which is collision-resistant and
//! cannot contain path separators, so it is safe to join onto a storage directory.

mod service;
mod stored_name;

pub use service::{Uuid, UuidService};
pub use stored_name::StoredName;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;

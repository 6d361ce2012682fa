//! # Consult Core
//!
//! Composition and normalisation of consultation records.
//!
//! This crate holds the logic with real invariants:
//! - [`lab`]: the lab vocabulary and the resolver that maps every historical spelling of a
//!   measurement to one canonical key
//! - [`highlight`]: which lab values are flagged as notable, in a UI scope and in storage
//! - [`composer`]: building a payload from form input and rendering a stored record
//! - [`review`]: the one-way reviewed flags on the prescription and order fields
//! - [`client`]: the submit, list and review flows against the persistence and storage
//!   collaborators
//!
//! Attachment validation and storage live in `consult_files`.
//!
//! **No API concerns**: HTTP servers and clients belong in `api-rest` and `api-client`.

pub mod client;
pub mod composer;
pub mod config;
pub mod constants;
pub mod error;
pub mod highlight;
pub mod lab;
pub mod record;
pub mod repositories;
pub mod review;
pub mod session;

pub use client::{ConsultationClient, ScopedClient};
pub use config::CoreConfig;
pub use error::{ConsultError, ConsultResult, ValidationError};
pub use record::{ConsultationPayload, ConsultationRecord, LabValue, LabValues};
pub use review::{ReviewField, ReviewState};

pub use consult_files::{Attachment, AttachmentPolicy, FilesService, PendingBatch, UploadFile};
pub use consult_types::NonEmptyText;
pub use consult_uuid::{StoredName, UuidService};

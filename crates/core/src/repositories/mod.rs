//! Collaborator contracts and their local implementations.
//!
//! The client orchestration in [`crate::client`] talks to persistence and storage only
//! through [`ConsultationStore`] and [`AttachmentStorage`]. This crate implements both on
//! the local filesystem; the `api-client` crate implements them over HTTP.

mod attachments;
mod consultations;

pub use attachments::LocalAttachmentStorage;
pub use consultations::FsConsultationStore;

use crate::error::ConsultResult;
use crate::record::{ConsultationPayload, ConsultationRecord};
use crate::review::ReviewField;
use consult_files::{Attachment, UploadFile};
use consult_uuid::{StoredName, UuidService};
use std::future::Future;

/// Persistence collaborator for consultations.
///
/// Writes are last-write-wins: there is no version token, so two sessions editing the same
/// consultation overwrite each other.
pub trait ConsultationStore: Send + Sync {
    fn create(
        &self,
        patient_id: &UuidService,
        payload: &ConsultationPayload,
    ) -> impl Future<Output = ConsultResult<ConsultationRecord>> + Send;

    fn update(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        payload: &ConsultationPayload,
    ) -> impl Future<Output = ConsultResult<ConsultationRecord>> + Send;

    fn delete(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
    ) -> impl Future<Output = ConsultResult<()>> + Send;

    /// Newest visit first.
    fn list(
        &self,
        patient_id: &UuidService,
    ) -> impl Future<Output = ConsultResult<Vec<ConsultationRecord>>> + Send;

    /// Sets a reviewed flag. Marking an already reviewed field succeeds without change.
    fn mark_reviewed(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        field: ReviewField,
    ) -> impl Future<Output = ConsultResult<()>> + Send;
}

/// Storage collaborator for attachment bytes.
pub trait AttachmentStorage: Send + Sync {
    fn upload(&self, file: &UploadFile) -> impl Future<Output = ConsultResult<Attachment>> + Send;

    /// Returns the bytes and their MIME type.
    fn download(
        &self,
        stored_name: &StoredName,
    ) -> impl Future<Output = ConsultResult<(Vec<u8>, String)>> + Send;
}

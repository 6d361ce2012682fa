use super::AttachmentStorage;
use crate::error::ConsultResult;
use consult_files::{Attachment, AttachmentPolicy, FilesService, UploadFile};
use consult_uuid::StoredName;

/// [`AttachmentStorage`] backed by a local [`FilesService`].
#[derive(Debug, Clone)]
pub struct LocalAttachmentStorage {
    files: FilesService,
    policy: AttachmentPolicy,
}

impl LocalAttachmentStorage {
    pub fn new(files: FilesService, policy: AttachmentPolicy) -> Self {
        Self { files, policy }
    }

    pub fn files(&self) -> &FilesService {
        &self.files
    }
}

impl AttachmentStorage for LocalAttachmentStorage {
    async fn upload(&self, file: &UploadFile) -> ConsultResult<Attachment> {
        Ok(self.files.store(&self.policy, file)?)
    }

    async fn download(&self, stored_name: &StoredName) -> ConsultResult<(Vec<u8>, String)> {
        let (bytes, mime) = self.files.read(stored_name)?;
        Ok((bytes, mime.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConsultError, ValidationError};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_then_download() {
        let temp = TempDir::new().unwrap();
        let storage = LocalAttachmentStorage::new(
            FilesService::new(temp.path()).unwrap(),
            AttachmentPolicy::default(),
        );

        let file = UploadFile::new("ecg.jpg", vec![0xff, 0xd8, 0xff]).unwrap();
        let attachment = storage.upload(&file).await.unwrap();
        let (bytes, mime) = storage.download(&attachment.stored_name).await.unwrap();

        assert_eq!(bytes, vec![0xff, 0xd8, 0xff]);
        assert_eq!(mime, "image/jpeg");
    }

    #[tokio::test]
    async fn test_rejection_maps_to_validation_error() {
        let temp = TempDir::new().unwrap();
        let storage = LocalAttachmentStorage::new(
            FilesService::new(temp.path()).unwrap(),
            AttachmentPolicy::default(),
        );

        let file = UploadFile::new("run.sh", b"#!/bin/sh".to_vec()).unwrap();
        let err = storage.upload(&file).await.unwrap_err();
        assert!(matches!(
            err,
            ConsultError::Validation(ValidationError::Attachment(_))
        ));
    }

    #[tokio::test]
    async fn test_download_unknown_is_not_found() {
        let temp = TempDir::new().unwrap();
        let storage = LocalAttachmentStorage::new(
            FilesService::new(temp.path()).unwrap(),
            AttachmentPolicy::default(),
        );

        let err = storage
            .download(&StoredName::generate("pdf").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::NotFound(_)));
    }
}

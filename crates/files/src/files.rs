//! Attachment storage service
//!
//! [`FilesService`] writes validated uploads under the data directory and reads them back for
//! download. Each stored file gets a YAML sidecar holding its [`Attachment`] metadata.
//!
//! # Storage Layout
//!
//! ```text
//! <data_dir>/attachments/<shard>/<uuid>.<ext>        # bytes
//! <data_dir>/attachments/<shard>/<uuid>.<ext>.yaml   # Attachment metadata
//! ```
//!
//! `<shard>` is the first two hex characters of the UUID. Paths are only ever derived from a
//! [`StoredName`], never from a user-supplied filename.
//!
//! # Implementation Notes
//!
//! - The data directory must exist and is canonicalised at construction time
//! - The `attachments/` folder is created on first upload
//! - Bytes and sidecar are written to a temporary file first and renamed into place, so a
//!   reader never observes a half-written attachment

use crate::constants::{ATTACHMENTS_FOLDER_NAME, DOWNLOAD_ROUTE_PREFIX};
use crate::content_type::resolve_content_type;
use crate::validation::{AttachmentPolicy, UploadFile};
use crate::FilesError;
use chrono::{DateTime, Utc};
use consult_types::NonEmptyText;
use consult_uuid::StoredName;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const METADATA_SUFFIX: &str = "yaml";

/// Metadata describing one stored attachment.
///
/// This is what a consultation record refers to. It is written once at upload time and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Name of the file as the user selected it; display only
    pub original_name: NonEmptyText,

    /// Opaque name the bytes are stored under
    pub stored_name: StoredName,

    /// Lowercase extension, without the dot
    pub extension: String,

    /// MIME type resolved from the extension
    pub mime_type: String,

    pub size_bytes: u64,

    pub uploaded_at: DateTime<Utc>,

    /// Route at which the bytes can be downloaded
    pub download_url: String,

    /// Hex-encoded SHA-256 of the stored bytes
    pub sha256: String,
}

/// Stores and retrieves attachment bytes beneath a data directory.
#[derive(Debug, Clone)]
pub struct FilesService {
    data_dir: PathBuf,
}

impl FilesService {
    /// Creates a service rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if `data_dir` does not exist, is not a
    /// directory, or cannot be canonicalised.
    pub fn new(data_dir: &Path) -> Result<Self, FilesError> {
        if !data_dir.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                data_dir.display()
            )));
        }

        if !data_dir.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                data_dir.display()
            )));
        }

        let data_dir = data_dir.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                data_dir.display(),
                e
            ))
        })?;

        Ok(Self { data_dir })
    }

    /// Validates and stores a single upload.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Rejected`] if the file fails `policy`; nothing is written in that
    /// case. I/O and metadata errors are propagated.
    pub fn store(
        &self,
        policy: &AttachmentPolicy,
        file: &UploadFile,
    ) -> Result<Attachment, FilesError> {
        policy.validate(file).map_err(FilesError::Rejected)?;

        let stored_name = StoredName::generate(&file.extension())?;
        let path = self.storage_path(&stored_name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        write_atomically(&path, file.bytes())?;

        let attachment = Attachment {
            original_name: file.original_name().clone(),
            extension: stored_name.extension().to_owned(),
            mime_type: resolve_content_type(&stored_name.to_string()).to_owned(),
            size_bytes: file.size_bytes(),
            uploaded_at: Utc::now(),
            download_url: download_url(&stored_name),
            sha256: hex::encode(Sha256::digest(file.bytes())),
            stored_name,
        };

        let yaml = serde_yaml::to_string(&attachment)?;
        write_atomically(&metadata_path(&path), yaml.as_bytes())?;

        tracing::info!(
            stored_name = %attachment.stored_name,
            size_bytes = attachment.size_bytes,
            mime_type = %attachment.mime_type,
            "stored attachment"
        );

        Ok(attachment)
    }

    /// Reads the bytes of a stored attachment together with its MIME type.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::NotFound`] if nothing is stored under `stored_name`.
    pub fn read(&self, stored_name: &StoredName) -> Result<(Vec<u8>, &'static str), FilesError> {
        let path = self.storage_path(stored_name);
        if !path.is_file() {
            return Err(FilesError::NotFound(stored_name.to_string()));
        }

        let bytes = fs::read(&path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read file from {}: {}", path.display(), e),
            ))
        })?;

        Ok((bytes, resolve_content_type(&stored_name.to_string())))
    }

    /// Reads the metadata sidecar of a stored attachment.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::NotFound`] if no sidecar exists for `stored_name`.
    pub fn metadata(&self, stored_name: &StoredName) -> Result<Attachment, FilesError> {
        let path = metadata_path(&self.storage_path(stored_name));
        if !path.is_file() {
            return Err(FilesError::NotFound(stored_name.to_string()));
        }

        let yaml = fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&yaml)?)
    }

    /// Returns the canonical data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn storage_path(&self, stored_name: &StoredName) -> PathBuf {
        let id = stored_name.id().to_string();
        self.data_dir
            .join(ATTACHMENTS_FOLDER_NAME)
            .join(&id[0..2])
            .join(stored_name.to_string())
    }
}

/// Download route for a stored name, e.g. `/attachments/<uuid>.pdf`.
pub fn download_url(stored_name: &StoredName) -> String {
    format!("{}/{}", DOWNLOAD_ROUTE_PREFIX, stored_name)
}

fn metadata_path(storage_path: &Path) -> PathBuf {
    let mut name = storage_path.as_os_str().to_owned();
    name.push(".");
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), FilesError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(|e| {
        FilesError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write file to {}: {}", tmp.display(), e),
        ))
    })?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::RejectionReason;
    use tempfile::TempDir;

    fn service() -> (TempDir, FilesService) {
        let temp = TempDir::new().unwrap();
        let service = FilesService::new(temp.path()).unwrap();
        (temp, service)
    }

    #[test]
    fn test_new_rejects_missing_directory() {
        let temp = TempDir::new().unwrap();
        let result = FilesService::new(&temp.path().join("missing"));
        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_rejects_file_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file.txt");
        fs::write(&path, "not a directory").unwrap();

        let result = FilesService::new(&path);
        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_store_records_metadata() {
        let (_temp, service) = service();
        let file = UploadFile::new("Blood Panel.PDF", b"%PDF-1.4 hello".to_vec()).unwrap();

        let attachment = service
            .store(&AttachmentPolicy::default(), &file)
            .unwrap();

        assert_eq!(attachment.original_name.as_str(), "Blood Panel.PDF");
        assert_eq!(attachment.extension, "pdf");
        assert_eq!(attachment.mime_type, "application/pdf");
        assert_eq!(attachment.size_bytes, 14);
        assert_eq!(
            attachment.download_url,
            format!("/attachments/{}", attachment.stored_name)
        );
        assert_eq!(attachment.sha256, hex::encode(Sha256::digest(b"%PDF-1.4 hello")));
        assert!(!attachment.stored_name.to_string().contains("Blood"));
    }

    #[test]
    fn test_store_and_read_back() {
        let (_temp, service) = service();
        let file = UploadFile::new("photo.png", vec![0x89, 0x50, 0x4e, 0x47]).unwrap();

        let attachment = service
            .store(&AttachmentPolicy::default(), &file)
            .unwrap();
        let (bytes, mime) = service.read(&attachment.stored_name).unwrap();

        assert_eq!(bytes, vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(mime, "image/png");
        assert_eq!(service.metadata(&attachment.stored_name).unwrap(), attachment);
    }

    #[test]
    fn test_same_original_name_gets_distinct_stored_names() {
        let (_temp, service) = service();
        let policy = AttachmentPolicy::default();
        let file = UploadFile::new("notes.txt", b"abc".to_vec()).unwrap();

        let first = service.store(&policy, &file).unwrap();
        let second = service.store(&policy, &file).unwrap();

        assert_ne!(first.stored_name, second.stored_name);
        assert_eq!(service.read(&first.stored_name).unwrap().0, b"abc");
        assert_eq!(service.read(&second.stored_name).unwrap().0, b"abc");
    }

    #[test]
    fn test_rejected_upload_writes_nothing() {
        let (temp, service) = service();
        let file = UploadFile::new("tool.exe", b"MZ".to_vec()).unwrap();

        let err = service
            .store(&AttachmentPolicy::default(), &file)
            .unwrap_err();

        match err {
            FilesError::Rejected(rejections) => assert!(matches!(
                rejections[0].reason,
                RejectionReason::DisallowedType { .. }
            )),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!temp.path().join(ATTACHMENTS_FOLDER_NAME).exists());
    }

    #[test]
    fn test_read_unknown_name_is_not_found() {
        let (_temp, service) = service();
        let name = StoredName::generate("pdf").unwrap();

        assert!(matches!(service.read(&name), Err(FilesError::NotFound(_))));
        assert!(matches!(
            service.metadata(&name),
            Err(FilesError::NotFound(_))
        ));
    }

    #[test]
    fn test_storage_is_sharded_by_id_prefix() {
        let (_temp, service) = service();
        let file = UploadFile::new("a.txt", b"x".to_vec()).unwrap();
        let attachment = service
            .store(&AttachmentPolicy::default(), &file)
            .unwrap();

        let id = attachment.stored_name.id().to_string();
        let expected = service
            .data_dir()
            .join(ATTACHMENTS_FOLDER_NAME)
            .join(&id[0..2])
            .join(attachment.stored_name.to_string());
        assert!(expected.is_file());
        assert!(metadata_path(&expected).is_file());
    }
}

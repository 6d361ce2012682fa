//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into services by `Arc`.
//! Nothing in this crate reads environment variables.

use crate::constants::CONSULTATIONS_DIR_NAME;
use consult_files::{AttachmentPolicy, ATTACHMENTS_FOLDER_NAME};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    attachment_policy: AttachmentPolicy,
}

impl CoreConfig {
    pub fn new(data_dir: PathBuf, attachment_policy: AttachmentPolicy) -> Self {
        Self {
            data_dir,
            attachment_policy,
        }
    }

    /// Configuration with the default attachment limits (10 MiB, 5 files per batch).
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self::new(data_dir, AttachmentPolicy::default())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn consultations_dir(&self) -> PathBuf {
        self.data_dir.join(CONSULTATIONS_DIR_NAME)
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.data_dir.join(ATTACHMENTS_FOLDER_NAME)
    }

    pub fn attachment_policy(&self) -> &AttachmentPolicy {
        &self.attachment_policy
    }

    /// Creates the data directory if missing.
    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_directories() {
        let cfg = CoreConfig::with_data_dir(PathBuf::from("/srv/consult"));
        assert_eq!(
            cfg.consultations_dir(),
            PathBuf::from("/srv/consult/consultations")
        );
        assert_eq!(cfg.attachments_dir(), PathBuf::from("/srv/consult/attachments"));
        assert_eq!(cfg.attachment_policy().max_files, 5);
    }
}

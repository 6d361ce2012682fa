//! The set of files chosen for upload but not yet sent.

use crate::validation::{AttachmentPolicy, Rejection, UploadFile};

/// Files selected for upload alongside a consultation.
///
/// Selecting a file whose name is already pending is a no-op; the pending file stays. Every addition
/// is validated against the policy together with the files already pending, so the batch is
/// valid whenever it is non-empty.
#[derive(Debug, Clone, Default)]
pub struct PendingBatch {
    policy: AttachmentPolicy,
    files: Vec<UploadFile>,
}

impl PendingBatch {
    pub fn new(policy: AttachmentPolicy) -> Self {
        Self {
            policy,
            files: Vec::new(),
        }
    }

    /// Adds `selection` to the batch.
    ///
    /// Nothing is added if any selected file, or the resulting batch, is rejected.
    pub fn add(&mut self, selection: Vec<UploadFile>) -> Result<(), Vec<Rejection>> {
        let mut merged = self.files.clone();
        for file in selection {
            if merged
                .iter()
                .all(|f| f.original_name() != file.original_name())
            {
                merged.push(file);
            }
        }

        self.policy.validate_batch(&merged)?;
        self.files = merged;
        Ok(())
    }

    /// Removes the pending file with the given name, returning it if present.
    pub fn remove(&mut self, original_name: &str) -> Option<UploadFile> {
        let index = self
            .files
            .iter()
            .position(|f| f.original_name().as_str() == original_name)?;
        Some(self.files.remove(index))
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn into_files(self) -> Vec<UploadFile> {
        self.files
    }
}

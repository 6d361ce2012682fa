//! Upload validation rules.
//!
//! Validation is pure: it inspects names and sizes only and never touches storage, so callers
//! can reject a batch before any collaborator is contacted.

use crate::constants::{ALLOWED_EXTENSIONS, MAX_BATCH_FILES, MAX_FILE_SIZE_BYTES};
use crate::content_type::format_file_size;
use crate::FilesError;
use consult_types::NonEmptyText;
use std::fmt;

/// A file selected for upload: its user-facing name and its bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    original_name: NonEmptyText,
    bytes: Vec<u8>,
}

impl UploadFile {
    /// Creates an upload candidate.
    ///
    /// Any directory components in `original_name` are discarded; only the final path segment
    /// is kept as the display name.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidFilename`] if no usable name remains.
    pub fn new(original_name: &str, bytes: Vec<u8>) -> Result<Self, FilesError> {
        let base = original_name
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or_default();
        let original_name = NonEmptyText::new(base)
            .map_err(|_| FilesError::InvalidFilename(original_name.to_owned()))?;

        Ok(Self {
            original_name,
            bytes,
        })
    }

    pub fn original_name(&self) -> &NonEmptyText {
        &self.original_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercase extension after the last dot, or an empty string when there is none.
    pub fn extension(&self) -> String {
        match self.original_name.as_str().rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => String::new(),
        }
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("original_name", &self.original_name)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// Why a file or batch was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    TooLarge { size_bytes: u64, limit_bytes: u64 },
    DisallowedType { extension: String },
    Empty,
    TooManyFiles { count: usize, max: usize },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::TooLarge {
                size_bytes,
                limit_bytes,
            } => write!(
                f,
                "too large ({} exceeds the {} limit)",
                format_file_size(*size_bytes),
                format_file_size(*limit_bytes)
            ),
            RejectionReason::DisallowedType { extension } if extension.is_empty() => {
                write!(f, "disallowed type (no extension)")
            }
            RejectionReason::DisallowedType { extension } => {
                write!(f, "disallowed type (.{})", extension)
            }
            RejectionReason::Empty => write!(f, "empty file"),
            RejectionReason::TooManyFiles { count, max } => {
                write!(f, "too many files ({} selected, at most {})", count, max)
            }
        }
    }
}

/// A rejection, naming the offending file when the reason concerns a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file: Option<String>,
    pub reason: RejectionReason,
}

impl Rejection {
    fn for_file(file: &UploadFile, reason: RejectionReason) -> Self {
        Self {
            file: Some(file.original_name().to_string()),
            reason,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(name) => write!(f, "{}: {}", name, self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// Size, type and count limits applied to uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPolicy {
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_FILE_SIZE_BYTES,
            max_files: MAX_BATCH_FILES,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl AttachmentPolicy {
    /// Validates a single file against the size and extension rules.
    ///
    /// Every failing rule is reported, so an oversized `.exe` yields two rejections.
    pub fn validate(&self, file: &UploadFile) -> Result<(), Vec<Rejection>> {
        let mut rejections = Vec::new();

        if file.size_bytes() == 0 {
            rejections.push(Rejection::for_file(file, RejectionReason::Empty));
        } else if file.size_bytes() > self.max_file_bytes {
            rejections.push(Rejection::for_file(
                file,
                RejectionReason::TooLarge {
                    size_bytes: file.size_bytes(),
                    limit_bytes: self.max_file_bytes,
                },
            ));
        }

        let extension = file.extension();
        if !self.allowed_extensions.iter().any(|e| *e == extension) {
            rejections.push(Rejection::for_file(
                file,
                RejectionReason::DisallowedType { extension },
            ));
        }

        if rejections.is_empty() {
            Ok(())
        } else {
            Err(rejections)
        }
    }

    /// Validates a batch.
    ///
    /// A batch larger than `max_files` is refused as a whole without inspecting individual
    /// files; otherwise the rejections of every file are aggregated.
    pub fn validate_batch(&self, files: &[UploadFile]) -> Result<(), Vec<Rejection>> {
        if files.len() > self.max_files {
            return Err(vec![Rejection {
                file: None,
                reason: RejectionReason::TooManyFiles {
                    count: files.len(),
                    max: self.max_files,
                },
            }]);
        }

        let rejections: Vec<Rejection> = files
            .iter()
            .filter_map(|f| self.validate(f).err())
            .flatten()
            .collect();

        if rejections.is_empty() {
            Ok(())
        } else {
            Err(rejections)
        }
    }
}

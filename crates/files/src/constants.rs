//! Limits and names used by the attachment subsystem.

/// Folder (under the data directory) holding stored attachments.
pub const ATTACHMENTS_FOLDER_NAME: &str = "attachments";

/// Route prefix of the download reference recorded in attachment metadata.
pub const DOWNLOAD_ROUTE_PREFIX: &str = "/attachments";

/// Largest accepted attachment (10 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Largest number of files accepted in one upload batch.
pub const MAX_BATCH_FILES: usize = 5;

/// Lowercase extensions (without dot) accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "gif", "doc", "docx", "txt"];

//! Extension to MIME type lookup.

/// Fallback MIME type for unrecognised extensions.
pub const GENERIC_BINARY_TYPE: &str = "application/octet-stream";

/// Maps the extension of `stored_name` to a MIME type.
///
/// The lookup is case-insensitive and never fails: names without an extension, or with one
/// outside the table, resolve to [`GENERIC_BINARY_TYPE`].
pub fn resolve_content_type(stored_name: &str) -> &'static str {
    let extension = match stored_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return GENERIC_BINARY_TYPE,
    };

    match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => GENERIC_BINARY_TYPE,
    }
}

/// Formats a byte count for display, e.g. `2.00 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".into();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}

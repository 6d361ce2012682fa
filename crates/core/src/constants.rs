//! Constants used throughout the consult core crate.

/// Default directory for consultation and attachment data when none is configured.
pub const DEFAULT_DATA_DIR: &str = "consult_data";

/// Directory name (under the data directory) holding consultation records.
pub const CONSULTATIONS_DIR_NAME: &str = "consultations";

/// File extension of a stored consultation document.
pub const RECORD_FILE_EXTENSION: &str = "json";

/// Suffixes appended to lab field identifiers by the edit and create forms.
///
/// Checked in order; the edit suffix must come first because it ends with the create suffix.
pub const UI_IDENTIFIER_SUFFIXES: &[&str] = &["editarconsulta", "consulta"];

/// Review field identifiers accepted by `mark_reviewed`.
pub const REVIEW_FIELD_PRESCRIPTION: &str = "prescription";
pub const REVIEW_FIELD_ORDER: &str = "order";

/// Heading of the lab-date banner shown above decomposed lab values.
pub const LAB_DATE_BANNER_PREFIX: &str = "Fecha del Laboratorio";

/// Shown instead of the lab list when a consultation has no lab values.
pub const NO_LAB_VALUES_MESSAGE: &str = "No hay valores de laboratorio registrados para esta consulta.";

/// Form field names read by the composer. Lab fields are matched through the resolver.
pub const FORM_VISIT_DATE: &str = "visit_date";
pub const FORM_LAB_DATE: &str = "lab_date";
pub const FORM_REASON: &str = "reason";
pub const FORM_PRESCRIPTION: &str = "prescription";
pub const FORM_ORDER: &str = "order";
pub const FORM_NOTES: &str = "notes";

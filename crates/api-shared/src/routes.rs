//! Route paths of the REST surface.

pub const HEALTH: &str = "/health";
pub const CONSULTATIONS: &str = "/patients/:patient_id/consultations";
pub const CONSULTATION: &str = "/patients/:patient_id/consultations/:id";
pub const CONSULTATION_REVIEWED: &str = "/patients/:patient_id/consultations/:id/reviewed";
pub const ATTACHMENTS: &str = "/attachments";
pub const ATTACHMENT: &str = "/attachments/:stored_name";

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

pub fn consultations(patient_id: &str) -> String {
    format!("/patients/{}/consultations", patient_id)
}

pub fn consultation(patient_id: &str, id: &str) -> String {
    format!("/patients/{}/consultations/{}", patient_id, id)
}

pub fn consultation_reviewed(patient_id: &str, id: &str) -> String {
    format!("/patients/{}/consultations/{}/reviewed", patient_id, id)
}

pub fn attachment(stored_name: &str) -> String {
    format!("{}/{}", ATTACHMENTS, stored_name)
}

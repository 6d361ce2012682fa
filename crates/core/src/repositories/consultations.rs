//! Filesystem consultation store.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/consultations/
//!   <s1>/
//!     <s2>/
//!       <patient uuid>/
//!         <consultation uuid>.json
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the patient UUID.
//!
//! Each consultation is one JSON document, replaced whole on every write via a temporary
//! file and a rename. Concurrent editors are not coordinated: the last write wins.

use super::ConsultationStore;
use crate::config::CoreConfig;
use crate::constants::RECORD_FILE_EXTENSION;
use crate::error::{ConsultError, ConsultResult};
use crate::record::{ConsultationPayload, ConsultationRecord};
use crate::review::ReviewField;
use chrono::Utc;
use consult_uuid::UuidService;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct FsConsultationStore {
    cfg: Arc<CoreConfig>,
}

impl FsConsultationStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    pub fn create_record(
        &self,
        patient_id: &UuidService,
        payload: &ConsultationPayload,
    ) -> ConsultResult<ConsultationRecord> {
        let record = ConsultationRecord::from_payload(
            UuidService::new(),
            patient_id.clone(),
            payload.clone(),
            Utc::now(),
        );

        let patient_dir = self.patient_dir(patient_id);
        fs::create_dir_all(&patient_dir)?;
        write_record(&self.record_path(patient_id, &record.id), &record)?;

        tracing::info!(patient_id = %patient_id, consultation_id = %record.id, "consultation created");
        Ok(record)
    }

    pub fn get_record(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
    ) -> ConsultResult<ConsultationRecord> {
        let path = self.record_path(patient_id, id);
        if !path.is_file() {
            return Err(ConsultError::NotFound(format!("consultation {}", id)));
        }
        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Replaces the consultation with `payload`, keeping its identity, creation time and
    /// reviewed flags.
    pub fn update_record(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        payload: &ConsultationPayload,
    ) -> ConsultResult<ConsultationRecord> {
        let mut record = self.get_record(patient_id, id)?;
        record.replace_with(payload.clone(), Utc::now());
        write_record(&self.record_path(patient_id, id), &record)?;

        tracing::info!(patient_id = %patient_id, consultation_id = %id, "consultation updated");
        Ok(record)
    }

    /// Deletes the consultation document. Attachments it references are left in storage.
    pub fn delete_record(&self, patient_id: &UuidService, id: &UuidService) -> ConsultResult<()> {
        let path = self.record_path(patient_id, id);
        if !path.is_file() {
            return Err(ConsultError::NotFound(format!("consultation {}", id)));
        }
        fs::remove_file(&path)?;

        tracing::info!(patient_id = %patient_id, consultation_id = %id, "consultation deleted");
        Ok(())
    }

    /// Lists a patient's consultations, newest visit first.
    ///
    /// Documents that cannot be parsed are logged as warnings and skipped.
    pub fn list_records(&self, patient_id: &UuidService) -> ConsultResult<Vec<ConsultationRecord>> {
        let patient_dir = self.patient_dir(patient_id);
        let entries = match fs::read_dir(&patient_dir) {
            Ok(it) => it,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(RECORD_FILE_EXTENSION)
            {
                continue;
            }

            let parsed = fs::read_to_string(&path)
                .map_err(ConsultError::from)
                .and_then(|contents| {
                    serde_json::from_str::<ConsultationRecord>(&contents).map_err(ConsultError::from)
                });
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        "failed to read consultation: {} - {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        records.sort_by(|a, b| {
            b.visit_date
                .cmp(&a.visit_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(records)
    }

    pub fn mark_record_reviewed(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        field: ReviewField,
    ) -> ConsultResult<()> {
        let mut record = self.get_record(patient_id, id)?;
        if record.is_reviewed(field) {
            tracing::debug!(consultation_id = %id, field = %field, "already reviewed");
            return Ok(());
        }

        record.mark_reviewed(field, Utc::now());
        write_record(&self.record_path(patient_id, id), &record)?;

        tracing::info!(consultation_id = %id, field = %field, "marked reviewed");
        Ok(())
    }

    fn patient_dir(&self, patient_id: &UuidService) -> PathBuf {
        patient_id.sharded_dir(&self.cfg.consultations_dir())
    }

    fn record_path(&self, patient_id: &UuidService, id: &UuidService) -> PathBuf {
        self.patient_dir(patient_id)
            .join(format!("{}.{}", id, RECORD_FILE_EXTENSION))
    }
}

fn write_record(path: &Path, record: &ConsultationRecord) -> ConsultResult<()> {
    let json = serde_json::to_string_pretty(record)?;
    let tmp = path.with_extension(format!("{}.tmp", RECORD_FILE_EXTENSION));
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl ConsultationStore for FsConsultationStore {
    async fn create(
        &self,
        patient_id: &UuidService,
        payload: &ConsultationPayload,
    ) -> ConsultResult<ConsultationRecord> {
        self.create_record(patient_id, payload)
    }

    async fn update(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        payload: &ConsultationPayload,
    ) -> ConsultResult<ConsultationRecord> {
        self.update_record(patient_id, id, payload)
    }

    async fn delete(&self, patient_id: &UuidService, id: &UuidService) -> ConsultResult<()> {
        self.delete_record(patient_id, id)
    }

    async fn list(&self, patient_id: &UuidService) -> ConsultResult<Vec<ConsultationRecord>> {
        self.list_records(patient_id)
    }

    async fn mark_reviewed(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        field: ReviewField,
    ) -> ConsultResult<()> {
        self.mark_record_reviewed(patient_id, id, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::StoredHighlights;
    use crate::record::{LabValue, LabValues};
    use crate::lab::LabKey;
    use chrono::NaiveDate;
    use consult_types::NonEmptyText;
    use tempfile::TempDir;

    fn store() -> (TempDir, FsConsultationStore) {
        let temp = TempDir::new().unwrap();
        let cfg = Arc::new(CoreConfig::with_data_dir(temp.path().to_path_buf()));
        (temp, FsConsultationStore::new(cfg))
    }

    fn payload(reason: &str, day: u32) -> ConsultationPayload {
        let mut lab_values = LabValues::new();
        lab_values.set(LabKey::Glucose, Some(LabValue::Number(101.0)));
        ConsultationPayload {
            visit_date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            lab_date: None,
            reason: NonEmptyText::new(reason).unwrap(),
            prescription: Some("Losartan 50".into()),
            prescription_reviewed: false,
            order: Some("Perfil lipídico".into()),
            order_reviewed: false,
            notes: None,
            highlighted: StoredHighlights::from_keys(["gluc"]),
            attachments: vec![],
            lab_values,
        }
    }

    #[test]
    fn test_create_and_get() {
        let (_temp, store) = store();
        let patient = UuidService::new();

        let created = store.create_record(&patient, &payload("Control", 1)).unwrap();
        let fetched = store.get_record(&patient, &created.id).unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.patient_id, patient);
        assert_eq!(fetched.lab_value(LabKey::Glucose), Some(LabValue::Number(101.0)));
        assert!(fetched.attachments.is_empty());
    }

    #[test]
    fn test_record_is_sharded_by_patient() {
        let (temp, store) = store();
        let patient = UuidService::new();
        let created = store.create_record(&patient, &payload("Control", 1)).unwrap();

        let expected = patient
            .sharded_dir(&temp.path().join("consultations"))
            .join(format!("{}.json", created.id));
        assert!(expected.is_file());
    }

    #[test]
    fn test_list_newest_first_and_isolated_per_patient() {
        let (_temp, store) = store();
        let patient = UuidService::new();
        let other = UuidService::new();

        store.create_record(&patient, &payload("Older", 2)).unwrap();
        store.create_record(&patient, &payload("Newer", 20)).unwrap();
        store.create_record(&other, &payload("Other", 10)).unwrap();

        let reasons: Vec<String> = store
            .list_records(&patient)
            .unwrap()
            .into_iter()
            .map(|r| r.reason.into_inner())
            .collect();
        assert_eq!(reasons, vec!["Newer", "Older"]);
        assert!(store.list_records(&UuidService::new()).unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_unreadable_documents() {
        let (_temp, store) = store();
        let patient = UuidService::new();
        store.create_record(&patient, &payload("Control", 1)).unwrap();

        let dir = store.patient_dir(&patient);
        fs::write(dir.join(format!("{}.json", UuidService::new())), "{ not json").unwrap();

        assert_eq!(store.list_records(&patient).unwrap().len(), 1);
    }

    #[test]
    fn test_update_replaces_but_keeps_review() {
        let (_temp, store) = store();
        let patient = UuidService::new();
        let created = store.create_record(&patient, &payload("Control", 1)).unwrap();
        store
            .mark_record_reviewed(&patient, &created.id, ReviewField::Order)
            .unwrap();

        let mut edit = payload("Control anual", 3);
        edit.lab_values = LabValues::new();
        let updated = store.update_record(&patient, &created.id, &edit).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.reason.as_str(), "Control anual");
        assert!(updated.order_reviewed);
        assert!(!updated.prescription_reviewed);
        assert_eq!(updated.lab_value(LabKey::Glucose), None);
    }

    #[test]
    fn test_mark_reviewed_twice_is_safe() {
        let (_temp, store) = store();
        let patient = UuidService::new();
        let created = store.create_record(&patient, &payload("Control", 1)).unwrap();

        store
            .mark_record_reviewed(&patient, &created.id, ReviewField::Prescription)
            .unwrap();
        store
            .mark_record_reviewed(&patient, &created.id, ReviewField::Prescription)
            .unwrap();

        let record = store.get_record(&patient, &created.id).unwrap();
        assert!(record.prescription_reviewed);
    }

    #[test]
    fn test_missing_records_are_not_found() {
        let (_temp, store) = store();
        let patient = UuidService::new();
        let id = UuidService::new();

        assert!(matches!(store.get_record(&patient, &id), Err(ConsultError::NotFound(_))));
        assert!(matches!(store.delete_record(&patient, &id), Err(ConsultError::NotFound(_))));
        assert!(matches!(
            store.update_record(&patient, &id, &payload("Control", 1)),
            Err(ConsultError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let (_temp, store) = store();
        let patient = UuidService::new();
        let created = store.create_record(&patient, &payload("Control", 1)).unwrap();

        store.delete_record(&patient, &created.id).unwrap();
        assert!(store.list_records(&patient).unwrap().is_empty());
    }
}

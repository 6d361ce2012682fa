//! Consultation payloads and stored records.
//!
//! A [`ConsultationPayload`] is what the composer produces and the persistence collaborator
//! accepts. A [`ConsultationRecord`] is what the collaborator hands back. Records keep their
//! lab fields as a raw map because stored documents may carry the same measurement under
//! several historical field names; only [`ConsultationRecord::lab_value`] reads from it.

use crate::highlight::StoredHighlights;
use crate::lab::{stored_spellings, LabKey};
use crate::review::ReviewField;
use chrono::{DateTime, NaiveDate, Utc};
use consult_files::Attachment;
use consult_types::NonEmptyText;
use consult_uuid::UuidService;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A populated lab slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabValue {
    Number(f64),
    Text(String),
}

impl LabValue {
    /// Interprets a stored JSON value; null, blank text and non-finite numbers are absent.
    pub fn from_json(value: &Value) -> Option<LabValue> {
        match value {
            Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(LabValue::Number),
            Value::String(s) if !s.trim().is_empty() => Some(LabValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            LabValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            LabValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for LabValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabValue::Number(n) => write!(f, "{}", n),
            LabValue::Text(s) => f.write_str(s),
        }
    }
}

/// The lab slots of a composed payload, keyed by vocabulary entry.
///
/// Serialises as a flat map holding every canonical key, with `null` for empty slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabValues(BTreeMap<LabKey, LabValue>);

impl LabValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: LabKey) -> Option<&LabValue> {
        self.0.get(&key)
    }

    pub fn set(&mut self, key: LabKey, value: Option<LabValue>) {
        match value {
            Some(v) => {
                self.0.insert(key, v);
            }
            None => {
                self.0.remove(&key);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (LabKey, &LabValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads every slot from a field map, honouring the stored-spelling priority of each key.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let mut values = Self::new();
        for key in LabKey::ALL {
            let found = stored_spellings(key)
                .iter()
                .find_map(|name| fields.get(name).and_then(LabValue::from_json));
            values.set(key, found);
        }
        values
    }

    /// Populated slots as a field map under canonical names.
    pub fn to_fields(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.canonical().to_owned(), v.to_json()))
            .collect()
    }
}

impl Serialize for LabValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(LabKey::ALL.len()))?;
        for key in LabKey::ALL {
            map.serialize_entry(key.canonical(), &self.get(key))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LabValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_fields(&fields))
    }
}

/// A composed consultation, ready to be created or to replace an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationPayload {
    pub visit_date: NaiveDate,
    #[serde(default)]
    pub lab_date: Option<NaiveDate>,
    pub reason: NonEmptyText,
    #[serde(default)]
    pub prescription: Option<String>,
    #[serde(default)]
    pub prescription_reviewed: bool,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub order_reviewed: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub highlighted: StoredHighlights,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(flatten)]
    pub lab_values: LabValues,
}

/// A persisted consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: UuidService,
    pub patient_id: UuidService,
    pub visit_date: NaiveDate,
    #[serde(default)]
    pub lab_date: Option<NaiveDate>,
    pub reason: NonEmptyText,
    #[serde(default)]
    pub prescription: Option<String>,
    #[serde(default)]
    pub prescription_reviewed: bool,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub order_reviewed: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub highlighted: StoredHighlights,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Lab fields, under whatever names the document was written with.
    #[serde(flatten)]
    pub lab_fields: Map<String, Value>,
}

impl ConsultationRecord {
    pub fn from_payload(
        id: UuidService,
        patient_id: UuidService,
        payload: ConsultationPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            patient_id,
            visit_date: payload.visit_date,
            lab_date: payload.lab_date,
            reason: payload.reason,
            prescription: payload.prescription,
            prescription_reviewed: payload.prescription_reviewed,
            order: payload.order,
            order_reviewed: payload.order_reviewed,
            notes: payload.notes,
            highlighted: StoredHighlights::from_keys(payload.highlighted.keys()),
            attachments: payload.attachments,
            created_at: now,
            updated_at: now,
            lab_fields: payload.lab_values.to_fields(),
        }
    }

    /// Replaces the composed fields with `payload`.
    ///
    /// Reviewed flags already set stay set. Attachments are replaced only when the payload
    /// carries some; an edit without attachments keeps the existing list.
    pub fn replace_with(&mut self, payload: ConsultationPayload, now: DateTime<Utc>) {
        self.visit_date = payload.visit_date;
        self.lab_date = payload.lab_date;
        self.reason = payload.reason;
        self.prescription = payload.prescription;
        self.prescription_reviewed |= payload.prescription_reviewed;
        self.order = payload.order;
        self.order_reviewed |= payload.order_reviewed;
        self.notes = payload.notes;
        self.highlighted = StoredHighlights::from_keys(payload.highlighted.keys());
        if !payload.attachments.is_empty() {
            self.attachments = payload.attachments;
        }
        self.lab_fields = payload.lab_values.to_fields();
        self.updated_at = now;
    }

    /// Value of a lab slot, trying the canonical field name first and then its aliases.
    pub fn lab_value(&self, key: LabKey) -> Option<LabValue> {
        stored_spellings(key)
            .iter()
            .find_map(|name| self.lab_fields.get(name).and_then(LabValue::from_json))
    }

    pub fn action_text(&self, field: ReviewField) -> Option<&str> {
        match field {
            ReviewField::Prescription => self.prescription.as_deref(),
            ReviewField::Order => self.order.as_deref(),
        }
        .filter(|text| !text.trim().is_empty())
    }

    pub fn is_reviewed(&self, field: ReviewField) -> bool {
        match field {
            ReviewField::Prescription => self.prescription_reviewed,
            ReviewField::Order => self.order_reviewed,
        }
    }

    /// Sets the reviewed flag of `field`. There is no way to clear it.
    pub fn mark_reviewed(&mut self, field: ReviewField, now: DateTime<Utc>) {
        match field {
            ReviewField::Prescription => self.prescription_reviewed = true,
            ReviewField::Order => self.order_reviewed = true,
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(reason: &str) -> ConsultationPayload {
        ConsultationPayload {
            visit_date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            lab_date: None,
            reason: NonEmptyText::new(reason).unwrap(),
            prescription: Some("Enalapril 10 mg".into()),
            prescription_reviewed: false,
            order: None,
            order_reviewed: false,
            notes: None,
            highlighted: StoredHighlights::default(),
            attachments: vec![],
            lab_values: LabValues::new(),
        }
    }

    #[test]
    fn test_payload_serialises_every_slot() {
        let mut p = payload("Control");
        p.lab_values
            .set(LabKey::Glucose, Some(LabValue::Number(98.5)));

        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["gluc"], json!(98.5));
        assert_eq!(value["ct"], Value::Null);
        assert_eq!(value["valoresnoincluidos"], Value::Null);
        assert_eq!(value["reason"], json!("Control"));
    }

    #[test]
    fn test_payload_deserialises_legacy_spellings() {
        let value = json!({
            "visit_date": "2024-03-14",
            "reason": "Control",
            "COL": 210,
            "VFS": 90.5,
            "HbA1c": 6.1,
            "valoresNoIncluidos": "ferritina 45",
            "hb": ""
        });

        let p: ConsultationPayload = serde_json::from_value(value).unwrap();
        assert_eq!(p.lab_values.get(LabKey::TotalCholesterol), Some(&LabValue::Number(210.0)));
        assert_eq!(p.lab_values.get(LabKey::GlomerularFiltration), Some(&LabValue::Number(90.5)));
        assert_eq!(p.lab_values.get(LabKey::GlycatedHemoglobin), Some(&LabValue::Number(6.1)));
        assert_eq!(
            p.lab_values.get(LabKey::UnlistedValues),
            Some(&LabValue::Text("ferritina 45".into()))
        );
        assert_eq!(p.lab_values.get(LabKey::Hemoglobin), None);
    }

    #[test]
    fn test_payload_rejects_blank_reason() {
        let value = json!({ "visit_date": "2024-03-14", "reason": "   " });
        assert!(serde_json::from_value::<ConsultationPayload>(value).is_err());
    }

    #[test]
    fn test_canonical_spelling_wins_over_legacy() {
        let record: ConsultationRecord = serde_json::from_value(json!({
            "id": UuidService::new().to_string(),
            "patient_id": UuidService::new().to_string(),
            "visit_date": "2024-03-14",
            "reason": "Control",
            "created_at": "2024-03-14T10:00:00Z",
            "updated_at": "2024-03-14T10:00:00Z",
            "ct": 190,
            "COL": 210
        }))
        .unwrap();

        assert_eq!(record.lab_value(LabKey::TotalCholesterol), Some(LabValue::Number(190.0)));
    }

    #[test]
    fn test_replace_keeps_reviewed_flags_and_attachments() {
        let now = Utc::now();
        let mut record =
            ConsultationRecord::from_payload(UuidService::new(), UuidService::new(), payload("First"), now);
        record.mark_reviewed(ReviewField::Prescription, now);
        record.attachments = serde_json::from_value(json!([{
            "original_name": "a.pdf",
            "stored_name": format!("{}.pdf", UuidService::new()),
            "extension": "pdf",
            "mime_type": "application/pdf",
            "size_bytes": 3,
            "uploaded_at": "2024-03-14T10:00:00Z",
            "download_url": "/attachments/x.pdf",
            "sha256": "00"
        }]))
        .unwrap();

        record.replace_with(payload("Second"), Utc::now());

        assert_eq!(record.reason.as_str(), "Second");
        assert!(record.prescription_reviewed);
        assert_eq!(record.attachments.len(), 1);
    }

    #[test]
    fn test_blank_action_text_is_absent() {
        let mut record = ConsultationRecord::from_payload(
            UuidService::new(),
            UuidService::new(),
            payload("Control"),
            Utc::now(),
        );
        record.order = Some("   ".into());
        assert_eq!(record.action_text(ReviewField::Order), None);
        assert_eq!(
            record.action_text(ReviewField::Prescription),
            Some("Enalapril 10 mg")
        );
    }
}

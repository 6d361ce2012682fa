use super::form::{parse_date, parse_decimal, FormData};
use crate::constants::{
    FORM_LAB_DATE, FORM_NOTES, FORM_ORDER, FORM_PRESCRIPTION, FORM_REASON, FORM_VISIT_DATE,
};
use crate::error::ValidationError;
use crate::highlight::{extract_highlighted, LabScope, StoredHighlights};
use crate::lab::{resolve, LabKey, SlotKind};
use crate::record::{ConsultationPayload, LabValue, LabValues};
use chrono::NaiveDate;
use consult_files::Attachment;
use consult_types::{optional_text, NonEmptyText};
use std::collections::BTreeMap;

const RESERVED_FIELDS: &[&str] = &[
    FORM_VISIT_DATE,
    FORM_LAB_DATE,
    FORM_REASON,
    FORM_PRESCRIPTION,
    FORM_ORDER,
    FORM_NOTES,
];

/// Builds a consultation payload from submitted form fields.
///
/// The reason is checked first: a blank reason fails before anything else is read. Lab
/// fields may be named with any spelling the resolver understands; when several fields map
/// to one slot, the one named exactly by the canonical key wins.
///
/// Highlights are taken from `scope`, attachments are included as given.
pub fn compose(
    form: &FormData,
    scope: &LabScope,
    attachments: Vec<Attachment>,
    today: NaiveDate,
) -> Result<ConsultationPayload, ValidationError> {
    let reason = form
        .get(FORM_REASON)
        .and_then(|r| NonEmptyText::new(r).ok())
        .ok_or(ValidationError::BlankReason)?;

    let visit_date = match form.get(FORM_VISIT_DATE) {
        Some(raw) if !raw.trim().is_empty() => parse_date(raw).unwrap_or_else(|| {
            tracing::warn!(visit_date = raw, "unparseable visit date; using today");
            today
        }),
        _ => today,
    };

    Ok(ConsultationPayload {
        visit_date,
        lab_date: form.get(FORM_LAB_DATE).and_then(parse_date),
        reason,
        prescription: optional_text(form.get(FORM_PRESCRIPTION)),
        prescription_reviewed: false,
        order: optional_text(form.get(FORM_ORDER)),
        order_reviewed: false,
        notes: optional_text(form.get(FORM_NOTES)),
        highlighted: StoredHighlights::from_keys(extract_highlighted(scope)),
        attachments,
        lab_values: read_lab_values(form),
    })
}

fn read_lab_values(form: &FormData) -> LabValues {
    // (exact canonical name?, raw value) per slot
    let mut raw_by_key: BTreeMap<LabKey, (bool, &str)> = BTreeMap::new();

    for (name, raw) in form.iter() {
        if RESERVED_FIELDS.contains(&name) || raw.trim().is_empty() {
            continue;
        }
        let Some(key) = resolve(name).as_key() else {
            tracing::debug!(field = name, "ignoring unrecognised form field");
            continue;
        };

        let exact = name == key.canonical();
        match raw_by_key.get(&key) {
            Some((true, _)) => {}
            Some((false, _)) if !exact => {}
            _ => {
                raw_by_key.insert(key, (exact, raw));
            }
        }
    }

    let mut values = LabValues::new();
    for (key, (_, raw)) in raw_by_key {
        let value = match key.kind() {
            SlotKind::Numeric => parse_decimal(raw).map(LabValue::Number),
            SlotKind::Text => Some(LabValue::Text(raw.to_owned())),
        };
        values.set(key, value);
    }
    values
}

use crate::constants::{LAB_DATE_BANNER_PREFIX, NO_LAB_VALUES_MESSAGE};
use crate::lab::LabKey;
use crate::record::{ConsultationRecord, LabValue};
use crate::review::{review_status, ReviewField, ReviewState};
use chrono::NaiveDate;
use consult_files::{format_file_size, Attachment};
use consult_uuid::UuidService;
use std::fmt;

/// A consultation prepared for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationView {
    pub id: UuidService,
    pub visit_date: NaiveDate,
    pub reason: String,
    pub prescription: Option<ActionView>,
    pub order: Option<ActionView>,
    pub notes: Option<String>,
    pub lab: LabSection,
    pub attachments: Vec<AttachmentView>,
}

impl ConsultationView {
    pub fn action(&self, field: ReviewField) -> Option<&ActionView> {
        match field {
            ReviewField::Prescription => self.prescription.as_ref(),
            ReviewField::Order => self.order.as_ref(),
        }
    }

    pub(crate) fn action_mut(&mut self, field: ReviewField) -> Option<&mut ActionView> {
        match field {
            ReviewField::Prescription => self.prescription.as_mut(),
            ReviewField::Order => self.order.as_mut(),
        }
    }
}

/// An action field with something in it, and its review state.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionView {
    pub text: String,
    pub review: ReviewState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabSection {
    NoValues,
    Values {
        banner: Option<LabDateBanner>,
        rows: Vec<LabRow>,
    },
}

impl LabSection {
    pub fn rows(&self) -> &[LabRow] {
        match self {
            LabSection::NoValues => &[],
            LabSection::Values { rows, .. } => rows,
        }
    }

    /// Display lines: banner first, then one line per row, or the empty-state message.
    pub fn lines(&self) -> Vec<String> {
        match self {
            LabSection::NoValues => vec![NO_LAB_VALUES_MESSAGE.to_owned()],
            LabSection::Values { banner, rows } => banner
                .iter()
                .map(ToString::to_string)
                .chain(rows.iter().map(ToString::to_string))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabDateBanner(pub NaiveDate);

impl fmt::Display for LabDateBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            LAB_DATE_BANNER_PREFIX,
            self.0.format("%d/%m/%Y")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabRow {
    pub key: LabKey,
    pub label: &'static str,
    pub value: LabValue,
    pub highlighted: bool,
}

impl fmt::Display for LabRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.highlighted { " [!]" } else { "" };
        write!(f, "{}: {}{}", self.label, self.value, marker)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentView {
    pub original_name: String,
    pub size: String,
    pub mime_type: String,
    pub download_url: String,
}

impl From<&Attachment> for AttachmentView {
    fn from(attachment: &Attachment) -> Self {
        Self {
            original_name: attachment.original_name.to_string(),
            size: format_file_size(attachment.size_bytes),
            mime_type: attachment.mime_type.clone(),
            download_url: attachment.download_url.clone(),
        }
    }
}

/// Prepares a stored record for display.
///
/// Each lab slot appears at most once, taking its value from the first populated spelling.
/// Slots without a value are left out. Review states come from the persisted flags.
pub fn decompose(record: &ConsultationRecord) -> ConsultationView {
    let highlighted = record.highlighted.keys();

    let rows: Vec<LabRow> = LabKey::ALL
        .into_iter()
        .filter_map(|key| {
            record.lab_value(key).map(|value| LabRow {
                key,
                label: key.label(),
                value,
                highlighted: highlighted.contains(key.canonical()),
            })
        })
        .collect();

    let lab = if rows.is_empty() {
        LabSection::NoValues
    } else {
        LabSection::Values {
            banner: record.lab_date.map(LabDateBanner),
            rows,
        }
    };

    let action = |field: ReviewField| {
        let text = record.action_text(field)?;
        let review = review_status(Some(text), record.is_reviewed(field))?;
        Some(ActionView {
            text: text.to_owned(),
            review,
        })
    };

    ConsultationView {
        id: record.id.clone(),
        visit_date: record.visit_date,
        reason: record.reason.to_string(),
        prescription: action(ReviewField::Prescription),
        order: action(ReviewField::Order),
        notes: record.notes.clone(),
        lab,
        attachments: record.attachments.iter().map(AttachmentView::from).collect(),
    }
}

//! Plain-text rendering of consultations for the terminal.

use consult_core::composer::{ActionView, ConsultationView};
use consult_core::lab::{resolve, Resolved};
use consult_core::{ReviewField, ReviewState};

pub fn review_label(state: ReviewState) -> &'static str {
    match state {
        ReviewState::Pending => "pending review",
        ReviewState::Saving => "reviewed (saving)",
        ReviewState::Reviewed => "reviewed",
        ReviewState::SaveFailed { .. } => "review not saved",
    }
}

fn action_line(field: ReviewField, action: &ActionView) -> String {
    let title = match field {
        ReviewField::Prescription => "Prescription",
        ReviewField::Order => "Order",
    };
    format!("  {}: {} [{}]", title, action.text, review_label(action.review))
}

/// One block of lines per consultation.
pub fn consultation_lines(view: &ConsultationView) -> Vec<String> {
    let mut lines = vec![format!(
        "{}  {}  ({})",
        view.visit_date.format("%d/%m/%Y"),
        view.reason,
        view.id
    )];

    for field in ReviewField::ALL {
        if let Some(action) = view.action(field) {
            lines.push(action_line(field, action));
        }
    }
    if let Some(notes) = &view.notes {
        lines.push(format!("  Notes: {}", notes));
    }

    lines.extend(view.lab.lines().into_iter().map(|l| format!("  {}", l)));

    for attachment in &view.attachments {
        lines.push(format!(
            "  Attachment: {} ({}, {}) {}",
            attachment.original_name, attachment.size, attachment.mime_type, attachment.download_url
        ));
    }
    lines
}

/// How one raw field name resolves against the lab vocabulary.
pub fn normalize_line(raw: &str) -> String {
    match resolve(raw) {
        Resolved::Known(key) => format!("{} -> {} ({})", raw, key.canonical(), key.label()),
        Resolved::Unrecognized(cleaned) => format!("{} -> {} (unrecognized)", raw, cleaned),
    }
}

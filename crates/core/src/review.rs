//! Review workflow for the prescription and order fields.
//!
//! Each action field carries a reviewed flag that only ever moves from unset to set. While a
//! confirmation is pending the client shows the field as reviewed; if the confirmation fails
//! the overlay records the failure and reverts to pending.

use crate::constants::{REVIEW_FIELD_ORDER, REVIEW_FIELD_PRESCRIPTION};
use crate::error::ValidationError;
use consult_uuid::UuidService;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewField {
    Prescription,
    Order,
}

impl ReviewField {
    pub const ALL: [ReviewField; 2] = [ReviewField::Prescription, ReviewField::Order];

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewField::Prescription => REVIEW_FIELD_PRESCRIPTION,
            ReviewField::Order => REVIEW_FIELD_ORDER,
        }
    }
}

impl FromStr for ReviewField {
    type Err = ValidationError;

    /// Case-insensitive; anything but the two field names is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        ReviewField::ALL
            .into_iter()
            .find(|f| f.as_str() == lowered)
            .ok_or_else(|| ValidationError::UnknownReviewField(s.to_owned()))
    }
}

impl fmt::Display for ReviewField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Pending,
    /// Confirmation requested; displayed as reviewed.
    Saving,
    Reviewed,
    SaveFailed { revert_to: RevertTarget },
}

/// The only state a failed save can fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertTarget {
    Pending,
}

impl ReviewState {
    pub fn from_flag(reviewed: bool) -> Self {
        if reviewed {
            ReviewState::Reviewed
        } else {
            ReviewState::Pending
        }
    }

    /// What the user sees: optimistic while saving, reverted after a failure.
    pub fn shows_reviewed(self) -> bool {
        matches!(self, ReviewState::Saving | ReviewState::Reviewed)
    }
}

/// Review state of one action field, or `None` when there is nothing to review.
pub fn review_status(action_text: Option<&str>, reviewed: bool) -> Option<ReviewState> {
    action_text
        .filter(|text| !text.trim().is_empty())
        .map(|_| ReviewState::from_flag(reviewed))
}

/// Outcome of asking to start a review save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginReview {
    /// The field moved to `Saving`; the caller must confirm or fail it.
    Started,
    /// Already reviewed or already saving; nothing to do.
    AlreadyDone(ReviewState),
}

/// Local, revertible overlay of review states on top of persisted flags.
#[derive(Debug, Default)]
pub struct ReviewOverlay {
    states: Mutex<HashMap<(UuidService, ReviewField), ReviewState>>,
}

impl ReviewOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, falling back to the persisted flag when the overlay has no entry.
    pub fn state(&self, record: &UuidService, field: ReviewField, persisted: bool) -> ReviewState {
        if persisted {
            return ReviewState::Reviewed;
        }
        self.lock()
            .get(&(record.clone(), field))
            .copied()
            .unwrap_or(ReviewState::Pending)
    }

    pub fn begin(&self, record: &UuidService, field: ReviewField, persisted: bool) -> BeginReview {
        let mut states = self.lock();
        let entry = states
            .entry((record.clone(), field))
            .or_insert(ReviewState::from_flag(persisted));

        if persisted {
            *entry = ReviewState::Reviewed;
        }

        match *entry {
            ReviewState::Pending | ReviewState::SaveFailed { .. } => {
                *entry = ReviewState::Saving;
                BeginReview::Started
            }
            current => BeginReview::AlreadyDone(current),
        }
    }

    pub fn confirm(&self, record: &UuidService, field: ReviewField) -> ReviewState {
        self.lock()
            .insert((record.clone(), field), ReviewState::Reviewed);
        ReviewState::Reviewed
    }

    /// Records a failed save. A field that was already confirmed stays reviewed.
    pub fn fail(&self, record: &UuidService, field: ReviewField) -> ReviewState {
        let mut states = self.lock();
        let entry = states
            .entry((record.clone(), field))
            .or_insert(ReviewState::Pending);
        if *entry != ReviewState::Reviewed {
            *entry = ReviewState::SaveFailed {
                revert_to: RevertTarget::Pending,
            };
        }
        *entry
    }

    /// Drops overlay entries for a record, e.g. once it has been reloaded.
    pub fn forget(&self, record: &UuidService) {
        self.lock().retain(|(id, _), _| id != record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(UuidService, ReviewField), ReviewState>> {
        self.states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

//! Highlight state tracking.
//!
//! A highlight marks a lab value as clinically notable. Highlights live on the labels of a
//! [`LabScope`] while a consultation is being edited, and as a [`StoredHighlights`] value once
//! persisted. Every key crosses between the two through the resolver, so a set saved by an
//! older client re-applies to the same labels.

mod controller;
mod scope;
mod stored;

pub use controller::HighlightController;
pub use scope::{LabLabel, LabScope, ListenerId};
pub use stored::{HighlightInput, StoredHighlights};

use std::collections::BTreeSet;

/// Canonical keys of every highlighted label in `scope`.
pub fn extract_highlighted(scope: &LabScope) -> BTreeSet<String> {
    scope
        .labels()
        .iter()
        .filter(|label| label.is_highlighted())
        .map(LabLabel::resolved_key)
        .filter(|key| !key.is_empty())
        .collect()
}

/// Marks every label in `scope` whose key is in `input`.
///
/// Labels already highlighted stay highlighted. Empty input leaves the scope untouched.
pub fn apply_highlighted(input: impl Into<HighlightInput>, scope: &mut LabScope) {
    let keys = input.into().normalized();
    if keys.is_empty() {
        return;
    }

    for label in scope.labels_mut() {
        if keys.contains(&label.resolved_key()) {
            label.set_highlighted(true);
        }
    }
}

/// Removes every highlight marker in `scope`.
pub fn clear_highlighted(scope: &mut LabScope) {
    for label in scope.labels_mut() {
        label.set_highlighted(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::LabKey;

    fn edit_form_scope() -> LabScope {
        LabScope::new(
            LabKey::ALL
                .into_iter()
                .map(|k| {
                    LabLabel::new(format!("{}:", k.label()))
                        .with_for(format!("{}EditarConsulta", k.canonical()))
                })
                .collect(),
        )
    }

    #[test]
    fn test_apply_then_extract_round_trip() {
        let mut scope = edit_form_scope();
        apply_highlighted(vec!["COL", "HbA1c", "hb", "Valores no incluidos"], &mut scope);

        let expected: BTreeSet<String> = ["ct", "hba1c", "hb", "valoresnoincluidos"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(extract_highlighted(&scope), expected);
    }

    #[test]
    fn test_round_trip_across_scopes_with_different_spellings() {
        let mut create_form = LabScope::for_vocabulary();
        apply_highlighted("[\"vfs\",\"T4l\"]", &mut create_form);
        let saved = extract_highlighted(&create_form);

        let mut edit_form = edit_form_scope();
        apply_highlighted(saved.clone(), &mut edit_form);
        assert_eq!(extract_highlighted(&edit_form), saved);
    }

    #[test]
    fn test_apply_empty_is_noop() {
        let mut scope = edit_form_scope();
        scope.labels_mut()[0].set_highlighted(true);

        apply_highlighted(Vec::<String>::new(), &mut scope);
        apply_highlighted("", &mut scope);
        assert_eq!(extract_highlighted(&scope).len(), 1);
    }

    #[test]
    fn test_clear_only_affects_given_scope() {
        let mut first = edit_form_scope();
        let mut second = LabScope::for_vocabulary();
        apply_highlighted(vec!["gluc"], &mut first);
        apply_highlighted(vec!["gluc"], &mut second);

        clear_highlighted(&mut first);
        assert!(extract_highlighted(&first).is_empty());
        assert_eq!(extract_highlighted(&second).len(), 1);
    }

    #[test]
    fn test_unknown_keys_do_not_mark_labels() {
        let mut scope = edit_form_scope();
        apply_highlighted(vec!["ferritina"], &mut scope);
        assert!(extract_highlighted(&scope).is_empty());
    }
}

//! In-memory model of a lab-values region: its labels and click listeners.

use crate::lab::normalize;
use std::fmt;

/// A label for one lab input inside a [`LabScope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabLabel {
    key_attr: Option<String>,
    for_attr: Option<String>,
    text: String,
    highlighted: bool,
}

impl LabLabel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            key_attr: None,
            for_attr: None,
            text: text.into(),
            highlighted: false,
        }
    }

    /// Sets the explicit key attribute, which takes priority when resolving.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key_attr = Some(key.into());
        self
    }

    /// Sets the id of the input this label describes.
    pub fn with_for(mut self, target: impl Into<String>) -> Self {
        self.for_attr = Some(target.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    pub fn toggle(&mut self) {
        self.highlighted = !self.highlighted;
    }

    /// Canonical key for this label: explicit key, then `for` target, then visible text.
    pub fn resolved_key(&self) -> String {
        let source = [self.key_attr.as_deref(), self.for_attr.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(self.text.as_str());
        normalize(source)
    }
}

/// Identifies a click listener registered on a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type ClickListener = Box<dyn Fn(&mut LabLabel) + Send + Sync>;

/// A bounded region holding lab labels.
///
/// Highlight operations only ever touch the labels of the scope they are given.
#[derive(Default)]
pub struct LabScope {
    labels: Vec<LabLabel>,
    listeners: Vec<(ListenerId, ClickListener)>,
    next_listener: u64,
}

impl LabScope {
    pub fn new(labels: Vec<LabLabel>) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }

    /// A scope with one label per vocabulary slot, keyed by canonical name.
    pub fn for_vocabulary() -> Self {
        Self::new(
            crate::lab::LabKey::ALL
                .into_iter()
                .map(|key| LabLabel::new(key.label()).with_for(key.canonical()))
                .collect(),
        )
    }

    pub fn labels(&self) -> &[LabLabel] {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut [LabLabel] {
        &mut self.labels
    }

    pub fn add_click_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&mut LabLabel) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener; returns whether it was registered.
    pub fn remove_click_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(registered, _)| *registered != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Dispatches a click on the label at `index` to every registered listener.
    ///
    /// Clicks outside the scope (an index with no label) are ignored.
    pub fn click(&mut self, index: usize) {
        let Some(label) = self.labels.get_mut(index) else {
            return;
        };
        for (_, listener) in &self.listeners {
            listener(label);
        }
    }

    /// Dispatches a click on the first label resolving to `key`.
    pub fn click_key(&mut self, key: &str) {
        let target = normalize(key);
        if let Some(index) = self.labels.iter().position(|l| l.resolved_key() == target) {
            self.click(index);
        }
    }
}

impl fmt::Debug for LabScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabScope")
            .field("labels", &self.labels)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_key_priority() {
        let label = LabLabel::new("HB (Hemoglobina):")
            .with_for("hba1cEditarConsulta")
            .with_key("COL");
        assert_eq!(label.resolved_key(), "ct");

        let label = LabLabel::new("HB (Hemoglobina):").with_for("hba1cEditarConsulta");
        assert_eq!(label.resolved_key(), "hba1c");

        let label = LabLabel::new("HB (Hemoglobina):").with_key("  ");
        assert_eq!(label.resolved_key(), "hb");
    }

    #[test]
    fn test_listeners_add_remove() {
        let mut scope = LabScope::new(vec![LabLabel::new("GR")]);
        let id = scope.add_click_listener(LabLabel::toggle);
        assert_eq!(scope.listener_count(), 1);

        scope.click(0);
        assert!(scope.labels()[0].is_highlighted());

        assert!(scope.remove_click_listener(id));
        assert!(!scope.remove_click_listener(id));
        scope.click(0);
        assert!(scope.labels()[0].is_highlighted());
    }

    #[test]
    fn test_click_outside_scope_ignored() {
        let mut scope = LabScope::new(vec![LabLabel::new("GR")]);
        scope.add_click_listener(LabLabel::toggle);
        scope.click(5);
        assert!(!scope.labels()[0].is_highlighted());
    }
}

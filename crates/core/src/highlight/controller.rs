//! Owner of a lab scope and its toggle handler.

use super::scope::{LabLabel, LabScope, ListenerId};
use super::{apply_highlighted, clear_highlighted, extract_highlighted, HighlightInput};
use std::collections::BTreeSet;

/// Controls highlights for one lab scope.
///
/// The controller owns the scope and the registration of its click-to-toggle handler. Create
/// it when the lab region appears and drop it (or call [`into_scope`](Self::into_scope)) when
/// the region goes away.
#[derive(Debug)]
pub struct HighlightController {
    scope: LabScope,
    toggle_listener: Option<ListenerId>,
}

impl HighlightController {
    pub fn new(scope: LabScope) -> Self {
        Self {
            scope,
            toggle_listener: None,
        }
    }

    /// Registers the click handler that toggles a label's highlight.
    ///
    /// Calling this again replaces the previous registration, so a click always toggles
    /// exactly once.
    pub fn attach_toggle_handler(&mut self) {
        if let Some(previous) = self.toggle_listener.take() {
            self.scope.remove_click_listener(previous);
        }
        self.toggle_listener = Some(self.scope.add_click_listener(LabLabel::toggle));
    }

    pub fn detach_toggle_handler(&mut self) {
        if let Some(previous) = self.toggle_listener.take() {
            self.scope.remove_click_listener(previous);
        }
    }

    pub fn extract(&self) -> BTreeSet<String> {
        extract_highlighted(&self.scope)
    }

    pub fn apply(&mut self, input: impl Into<HighlightInput>) {
        apply_highlighted(input, &mut self.scope);
    }

    pub fn clear(&mut self) {
        clear_highlighted(&mut self.scope);
    }

    pub fn scope(&self) -> &LabScope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut LabScope {
        &mut self.scope
    }

    /// Tears the controller down, removing its handler and handing back the scope.
    pub fn into_scope(mut self) -> LabScope {
        self.detach_toggle_handler();
        self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reattaching_toggles_once_per_click() {
        let mut controller = HighlightController::new(LabScope::for_vocabulary());
        controller.attach_toggle_handler();
        controller.attach_toggle_handler();
        controller.attach_toggle_handler();
        assert_eq!(controller.scope().listener_count(), 1);

        controller.scope_mut().click_key("ct");
        assert!(controller.extract().contains("ct"));

        controller.scope_mut().click_key("ct");
        assert!(controller.extract().is_empty());
    }

    #[test]
    fn test_into_scope_removes_handler() {
        let mut controller = HighlightController::new(LabScope::for_vocabulary());
        controller.attach_toggle_handler();
        controller.apply(vec!["tsh"]);

        let mut scope = controller.into_scope();
        assert_eq!(scope.listener_count(), 0);

        scope.click_key("tsh");
        assert!(scope
            .labels()
            .iter()
            .any(|l| l.is_highlighted() && l.resolved_key() == "tsh"));
    }

    #[test]
    fn test_clear_after_toggle() {
        let mut controller = HighlightController::new(LabScope::for_vocabulary());
        controller.attach_toggle_handler();
        controller.scope_mut().click(0);
        controller.scope_mut().click(1);
        assert_eq!(controller.extract().len(), 2);

        controller.clear();
        assert!(controller.extract().is_empty());
    }
}

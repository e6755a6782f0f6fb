//! Single-item selection and transform mode.

use crate::input::KeyEvent;
use crate::items::ItemId;
use crate::transform::Transform;
use serde::{Deserialize, Serialize};

/// Which transform the gizmo edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl TransformMode {
    pub fn name(self) -> &'static str {
        match self {
            TransformMode::Translate => "translate",
            TransformMode::Rotate => "rotate",
            TransformMode::Scale => "scale",
        }
    }
}

/// Selection change reported to the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    /// An item became selected; carries its transform at selection time.
    Selected { id: ItemId, transform: Transform },
    /// Nothing is selected anymore.
    Cleared,
    /// The user asked to delete the selected item.
    DeleteRequested { id: ItemId },
}

/// Outcome of a key press routed through the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    /// Not a scene shortcut, or nothing selected.
    Ignored,
    ModeChanged(TransformMode),
    Delete(ItemId),
}

impl KeyAction {
    /// Whether the host should suppress default handling of the key.
    pub fn prevents_default(&self) -> bool {
        !matches!(self, KeyAction::Ignored)
    }
}

/// Scene-wide selection state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: Option<ItemId>,
    pub mode: TransformMode,
}

/// Tracks the selected item and routes clicks and keys to selection changes.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected(&self) -> Option<ItemId> {
        self.state.selected
    }

    pub fn mode(&self) -> TransformMode {
        self.state.mode
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.state.selected == Some(id)
    }

    /// Select an item. Re-selecting the current item is not a transition.
    pub fn select(&mut self, id: ItemId, transform: Transform) -> Option<SelectionEvent> {
        if self.state.selected == Some(id) {
            return None;
        }
        self.state.selected = Some(id);
        Some(SelectionEvent::Selected { id, transform })
    }

    /// Click on empty space.
    pub fn clear(&mut self) -> Option<SelectionEvent> {
        self.state.selected.take().map(|_| SelectionEvent::Cleared)
    }

    /// Drop an item that no longer exists. Returns true if it was selected.
    pub fn forget(&mut self, id: ItemId) -> bool {
        if self.state.selected == Some(id) {
            self.state.selected = None;
            true
        } else {
            false
        }
    }

    /// Keyboard shortcuts, active only while an item is selected.
    ///
    /// `g` translate, `r` rotate, `s` scale, `Delete`/`Backspace` delete.
    pub fn handle_key(&mut self, event: &KeyEvent) -> KeyAction {
        let Some(id) = self.state.selected else {
            return KeyAction::Ignored;
        };

        let mode = match event.normalized().as_str() {
            "g" => TransformMode::Translate,
            "r" => TransformMode::Rotate,
            "s" => TransformMode::Scale,
            "delete" | "backspace" => return KeyAction::Delete(id),
            _ => return KeyAction::Ignored,
        };
        self.state.mode = mode;
        log::debug!("Transform mode: {}", mode.name());
        KeyAction::ModeChanged(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_initial_state() {
        let controller = SelectionController::new();
        assert_eq!(controller.selected(), None);
        assert_eq!(controller.mode(), TransformMode::Translate);
    }

    #[test]
    fn test_select_transitions() {
        let mut controller = SelectionController::new();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        assert_eq!(
            controller.select(a, Transform::IDENTITY),
            Some(SelectionEvent::Selected { id: a, transform: Transform::IDENTITY })
        );
        assert_eq!(controller.select(a, Transform::IDENTITY), None);
        assert!(matches!(
            controller.select(b, Transform::IDENTITY),
            Some(SelectionEvent::Selected { id, .. }) if id == b
        ));
        assert!(controller.is_selected(b));
    }

    #[test]
    fn test_clear() {
        let mut controller = SelectionController::new();
        assert_eq!(controller.clear(), None);
        controller.select(Uuid::now_v7(), Transform::IDENTITY);
        assert_eq!(controller.clear(), Some(SelectionEvent::Cleared));
        assert_eq!(controller.selected(), None);
    }

    #[test]
    fn test_keys_without_selection_are_ignored() {
        let mut controller = SelectionController::new();
        for key in ["g", "r", "s", "Delete", "Backspace"] {
            let action = controller.handle_key(&KeyEvent::new(key));
            assert_eq!(action, KeyAction::Ignored);
            assert!(!action.prevents_default());
        }
        assert_eq!(controller.mode(), TransformMode::Translate);
    }

    #[test]
    fn test_mode_keys() {
        let mut controller = SelectionController::new();
        controller.select(Uuid::now_v7(), Transform::IDENTITY);

        assert_eq!(controller.handle_key(&KeyEvent::new("r")), KeyAction::ModeChanged(TransformMode::Rotate));
        assert_eq!(controller.mode(), TransformMode::Rotate);
        assert_eq!(controller.handle_key(&KeyEvent::new("S")), KeyAction::ModeChanged(TransformMode::Scale));
        assert_eq!(controller.handle_key(&KeyEvent::new("g")), KeyAction::ModeChanged(TransformMode::Translate));
        assert!(controller.handle_key(&KeyEvent::new("g")).prevents_default());
        assert_eq!(controller.handle_key(&KeyEvent::new("x")), KeyAction::Ignored);
    }

    #[test]
    fn test_mode_persists_across_selection() {
        let mut controller = SelectionController::new();
        controller.select(Uuid::now_v7(), Transform::IDENTITY);
        controller.handle_key(&KeyEvent::new("s"));
        controller.clear();
        controller.select(Uuid::now_v7(), Transform::IDENTITY);
        assert_eq!(controller.mode(), TransformMode::Scale);
    }

    #[test]
    fn test_delete_keys() {
        let mut controller = SelectionController::new();
        let id = Uuid::now_v7();
        controller.select(id, Transform::IDENTITY);
        assert_eq!(controller.handle_key(&KeyEvent::new("Delete")), KeyAction::Delete(id));
        assert_eq!(controller.handle_key(&KeyEvent::new("Backspace")), KeyAction::Delete(id));
        // Deletion is the orchestrator's job; the key alone does not clear.
        assert_eq!(controller.selected(), Some(id));
        assert!(controller.forget(id));
        assert!(!controller.forget(id));
    }
}

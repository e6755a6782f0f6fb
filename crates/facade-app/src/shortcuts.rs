//! Keyboard shortcut registry and documentation.

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    /// Only active while a diagram is selected.
    pub needs_selection: bool,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(key: &'static str, needs_selection: bool, description: &'static str) -> Self {
        Self {
            key,
            needs_selection,
            description,
        }
    }

    /// Format the shortcut for display.
    pub fn format(&self) -> String {
        if self.key.chars().count() == 1 {
            self.key.to_uppercase()
        } else {
            self.key.to_string()
        }
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("g", true, "Move selected diagram"),
            Shortcut::new("r", true, "Rotate selected diagram"),
            Shortcut::new("s", true, "Scale selected diagram"),
            Shortcut::new("Delete", true, "Delete selected diagram"),
            Shortcut::new("Backspace", true, "Delete selected diagram"),
        ]
    }

    /// Look up a shortcut by key name, case-insensitively.
    pub fn find(key: &str) -> Option<Shortcut> {
        Self::all().into_iter().find(|s| s.key.eq_ignore_ascii_case(key))
    }

    /// Print all shortcuts to console.
    pub fn print_all() {
        println!("\n=== Keyboard Shortcuts ===");
        for shortcut in Self::all() {
            println!("  {:12} {}", shortcut.format(), shortcut.description);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facade_core::input::KeyEvent;
    use facade_core::selection::{KeyAction, SelectionController};
    use facade_core::transform::Transform;
    use facade_core::items::ItemId;

    #[test]
    fn test_format() {
        assert_eq!(Shortcut::new("g", true, "").format(), "G");
        assert_eq!(Shortcut::new("Delete", true, "").format(), "Delete");
    }

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(ShortcutRegistry::find("R").unwrap().description, "Rotate selected diagram");
        assert!(ShortcutRegistry::find("x").is_none());
    }

    #[test]
    fn test_every_shortcut_is_handled() {
        for shortcut in ShortcutRegistry::all() {
            let mut controller = SelectionController::new();
            let key = KeyEvent::new(shortcut.key);
            if shortcut.needs_selection {
                assert_eq!(controller.handle_key(&key), KeyAction::Ignored);
            }
            controller.select(ItemId::now_v7(), Transform::IDENTITY);
            assert!(
                controller.handle_key(&key).prevents_default(),
                "{} not handled",
                shortcut.key
            );
        }
    }
}

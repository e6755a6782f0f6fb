//! Pointer and keyboard events, and scoped input subscriptions.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer event in screen coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position } => *position,
        }
    }
}

/// A key press, named the way the browser names keys ("g", "Delete", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::default(),
        }
    }

    /// Lowercased key name, used for matching.
    pub fn normalized(&self) -> String {
        self.key.to_lowercase()
    }
}

/// What the scene did with a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyResponse {
    /// The host should suppress its default handling of this key.
    pub prevent_default: bool,
}

/// Any input event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
    /// Screen-space pan gesture.
    Pan(Vec2),
}

type Queue = Rc<RefCell<VecDeque<InputEvent>>>;

/// Fan-out of input events from the host window to scoped subscribers.
///
/// Subscribers hold a [`Subscription`]; dropping it unsubscribes, so no
/// handler outlives the scene that registered it.
#[derive(Debug, Default)]
pub struct InputBus {
    subscribers: RefCell<Vec<Weak<RefCell<VecDeque<InputEvent>>>>>,
}

impl InputBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.borrow_mut().push(Rc::downgrade(&queue));
        Subscription { queue }
    }

    /// Deliver an event to every live subscriber.
    pub fn emit(&self, event: InputEvent) {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|weak| weak.strong_count() > 0);
        for weak in subscribers.iter() {
            if let Some(queue) = weak.upgrade() {
                queue.borrow_mut().push_back(event.clone());
            }
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

/// A live subscription to an [`InputBus`]. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    queue: Queue,
}

impl Subscription {
    /// Take all events received since the last drain.
    pub fn drain(&self) -> Vec<InputEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        assert_eq!(KeyEvent::new("G").normalized(), "g");
        assert_eq!(KeyEvent::new("Delete").normalized(), "delete");
    }

    #[test]
    fn test_bus_delivers_to_all_subscribers() {
        let bus = InputBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.emit(InputEvent::Key(KeyEvent::new("r")));

        assert_eq!(a.drain().len(), 1);
        assert_eq!(b.drain().len(), 1);
        assert!(a.is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = InputBus::new();
        let a = bus.subscribe();
        {
            let _b = bus.subscribe();
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(InputEvent::Pan(Vec2::new(1.0, 0.0)));
        assert_eq!(a.drain().len(), 1);
        drop(a);
        bus.emit(InputEvent::Pan(Vec2::new(1.0, 0.0)));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_pointer_position() {
        let event = PointerEvent::Down {
            position: Point::new(3.0, 4.0),
            button: MouseButton::Left,
        };
        assert_eq!(event.position(), Point::new(3.0, 4.0));
    }
}

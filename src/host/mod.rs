//! Host environment abstraction.
//!
//! The hooks never talk to a browser directly. Everything they need from
//! the environment (a durable key-value store, a cookie jar, change
//! notifications, pointer events on an element and one-shot timers) goes
//! through the traits in this module.
//!
//! Every subscription returns an id that must be handed back to the same
//! host to unsubscribe; the hooks do this from their cleanups.
//!
//! - [`memory`] implements the traits in memory for tests and native use.
//! - `web` (behind the `web` feature) implements them with `web-sys`.

pub mod memory;
pub mod timer;
#[cfg(feature = "web")]
pub mod web;

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::Duration;

pub use memory::{MemoryElement, MemoryStorage};
pub use timer::ManualTimers;

/// Identifies a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Identifies a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Callback for external storage change notifications.
pub type ChangeHandler = Rc<dyn Fn()>;

/// A durable string key-value store with a cookie jar beside it.
///
/// Writes made through `set_item` must not raise a change notification in
/// the writing context; only writes from elsewhere do.
pub trait StorageHost {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn get_cookie(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Set a session cookie visible to every path on the site (`path=/`).
    fn set_cookie(&self, name: &str, value: &str) -> Result<(), StorageError>;

    /// Subscribe to change notifications raised by other contexts.
    fn subscribe_changes(&self, handler: ChangeHandler) -> ListenerId;

    fn unsubscribe_changes(&self, id: ListenerId);
}

/// An element's rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Inner size of an element, excluding borders and scrollbars.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientSize {
    pub width: f64,
    pub height: f64,
}

/// Pointer-move payload. Coordinates the event did not carry are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerMove {
    pub client_x: Option<f64>,
    pub client_y: Option<f64>,
}

impl PointerMove {
    pub fn at(client_x: f64, client_y: f64) -> Self {
        Self {
            client_x: Some(client_x),
            client_y: Some(client_y),
        }
    }
}

/// Pointer events delivered by a [`PointerTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerEvent {
    Move(PointerMove),
    Enter,
    Leave,
}

impl PointerEvent {
    pub fn kind(&self) -> PointerEventKind {
        match self {
            PointerEvent::Move(_) => PointerEventKind::Move,
            PointerEvent::Enter => PointerEventKind::Enter,
            PointerEvent::Leave => PointerEventKind::Leave,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Move,
    Enter,
    Leave,
}

/// Callback for pointer events.
pub type PointerHandler = Rc<dyn Fn(&PointerEvent)>;

/// An element that reports its geometry and pointer events.
pub trait PointerTarget {
    fn bounding_box(&self) -> Option<BoundingBox>;

    fn client_size(&self) -> Option<ClientSize>;

    fn add_pointer_listener(&self, kind: PointerEventKind, handler: PointerHandler) -> ListenerId;

    fn remove_pointer_listener(&self, id: ListenerId);
}

/// One-shot timers driven by the host's event loop.
pub trait TimerHost {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId;

    /// Cancel a timer. Unknown or already-fired ids are ignored.
    fn clear_timeout(&self, id: TimerId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_events_are_tagged_on_the_wire() {
        let event: PointerEvent =
            serde_json::from_str(r#"{"type":"move","clientX":3.0,"clientY":null}"#).unwrap();
        assert_eq!(
            event,
            PointerEvent::Move(PointerMove {
                client_x: Some(3.0),
                client_y: None
            })
        );
        assert_eq!(event.kind(), PointerEventKind::Move);

        let leave: PointerEvent = serde_json::from_str(r#"{"type":"leave"}"#).unwrap();
        assert_eq!(leave.kind(), PointerEventKind::Leave);

        let json = serde_json::to_string(&PointerEvent::Move(PointerMove::at(1.0, 2.0))).unwrap();
        assert_eq!(json, r#"{"type":"move","clientX":1.0,"clientY":2.0}"#);
    }
}

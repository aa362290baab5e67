//! In-memory hosts.
//!
//! `MemoryStorage` and `MemoryElement` are cheap handles over shared state:
//! clones observe and mutate the same store or element, which lets a test
//! act as "another tab" or as the browser dispatching events.

use super::{
    BoundingBox, ChangeHandler, ClientSize, ListenerId, PointerEvent, PointerEventKind,
    PointerHandler, PointerTarget, StorageHost,
};
use crate::error::StorageError;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

#[derive(Default)]
struct StorageState {
    items: HashMap<String, String>,
    cookies: HashMap<String, String>,
    listeners: BTreeMap<ListenerId, ChangeHandler>,
    next_listener: u64,
    write_failure: Option<StorageError>,
    cookie_failure: Option<StorageError>,
    read_failure: Option<StorageError>,
    writes: usize,
}

/// A key-value store and cookie jar kept in memory.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Rc<RefCell<StorageState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` as another context would, then notify listeners.
    pub fn external_set(&self, key: &str, value: &str) {
        self.state
            .borrow_mut()
            .items
            .insert(key.to_string(), value.to_string());
        self.notify();
    }

    /// Remove `key` as another context would, then notify listeners.
    pub fn external_remove(&self, key: &str) {
        self.state.borrow_mut().items.remove(key);
        self.notify();
    }

    /// Seed a raw value without notifying anyone.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.state
            .borrow_mut()
            .items
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.state.borrow().items.get(key).cloned()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.state.borrow().cookies.get(name).cloned()
    }

    /// Make every subsequent `set_item` fail with `error` (`None` clears it).
    pub fn fail_writes(&self, error: Option<StorageError>) {
        self.state.borrow_mut().write_failure = error;
    }

    pub fn fail_cookie_writes(&self, error: Option<StorageError>) {
        self.state.borrow_mut().cookie_failure = error;
    }

    pub fn fail_reads(&self, error: Option<StorageError>) {
        self.state.borrow_mut().read_failure = error;
    }

    /// Number of successful `set_item` calls so far.
    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    fn notify(&self) {
        let handlers: Vec<ChangeHandler> = self.state.borrow().listeners.values().cloned().collect();
        for handler in handlers {
            handler();
        }
    }
}

impl StorageHost for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let state = self.state.borrow();
        if let Some(error) = &state.read_failure {
            return Err(error.clone());
        }
        Ok(state.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = &state.write_failure {
            return Err(error.clone());
        }
        state.items.insert(key.to_string(), value.to_string());
        state.writes += 1;
        Ok(())
    }

    fn get_cookie(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self.cookie(name))
    }

    fn set_cookie(&self, name: &str, value: &str) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = &state.cookie_failure {
            return Err(error.clone());
        }
        state.cookies.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn subscribe_changes(&self, handler: ChangeHandler) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.insert(id, handler);
        id
    }

    fn unsubscribe_changes(&self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(&id);
    }
}

#[derive(Default)]
struct ElementState {
    bounds: Option<BoundingBox>,
    client_size: Option<ClientSize>,
    listeners: BTreeMap<ListenerId, (PointerEventKind, PointerHandler)>,
    next_listener: u64,
}

/// An element with settable geometry that dispatches synthetic events.
#[derive(Clone, Default)]
pub struct MemoryElement {
    state: Rc<RefCell<ElementState>>,
}

impl MemoryElement {
    /// An element whose client size matches its bounding box.
    pub fn new(bounds: BoundingBox) -> Self {
        let element = Self::default();
        element.set_bounds(Some(bounds));
        element.set_client_size(Some(ClientSize {
            width: bounds.width,
            height: bounds.height,
        }));
        element
    }

    pub fn set_bounds(&self, bounds: Option<BoundingBox>) {
        self.state.borrow_mut().bounds = bounds;
    }

    pub fn set_client_size(&self, size: Option<ClientSize>) {
        self.state.borrow_mut().client_size = size;
    }

    /// Deliver `event` to every listener registered for its kind.
    pub fn dispatch(&self, event: PointerEvent) {
        let kind = event.kind();
        let handlers: Vec<PointerHandler> = self
            .state
            .borrow()
            .listeners
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl PointerTarget for MemoryElement {
    fn bounding_box(&self) -> Option<BoundingBox> {
        self.state.borrow().bounds
    }

    fn client_size(&self) -> Option<ClientSize> {
        self.state.borrow().client_size
    }

    fn add_pointer_listener(&self, kind: PointerEventKind, handler: PointerHandler) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.insert(id, (kind, handler));
        id
    }

    fn remove_pointer_listener(&self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(&id);
    }
}

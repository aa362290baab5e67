//! Browser hosts built on `web-sys`.
//!
//! JavaScript values are converted into the crate's typed events and errors
//! at this boundary; nothing past it sees a `JsValue`.

use super::{
    BoundingBox, ChangeHandler, ClientSize, ListenerId, PointerEvent, PointerEventKind,
    PointerHandler, PointerMove, PointerTarget, StorageHost, TimerHost, TimerId,
};
use crate::error::StorageError;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, Event, EventTarget, HtmlDocument, MouseEvent, Storage, Window};

type EventClosure = Closure<dyn FnMut(Event)>;

fn storage_error(err: JsValue) -> StorageError {
    let name = js_sys::Reflect::get(&err, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string());
    match name.as_deref() {
        Some("QuotaExceededError") => StorageError::QuotaExceeded,
        Some("SecurityError") => StorageError::Unavailable,
        _ => StorageError::Backend(format!("{err:?}")),
    }
}

/// Cookie assignment for already-encoded parts, visible to every path on
/// the site.
fn cookie_string(name: &str, value: &str) -> String {
    format!("{name}={value}; path=/")
}

fn listen(target: &EventTarget, event: &str, closure: &EventClosure) {
    if let Err(err) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
        tracing::warn!(event, ?err, "failed to attach event listener");
    }
}

fn unlisten(target: &EventTarget, event: &str, closure: &EventClosure) {
    if let Err(err) =
        target.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
    {
        tracing::warn!(event, ?err, "failed to detach event listener");
    }
}

/// `localStorage` plus `document.cookie`, notified by the window's
/// `storage` event.
pub struct WebStorage {
    window: Window,
    listeners: RefCell<HashMap<ListenerId, EventClosure>>,
    next_listener: Cell<u64>,
}

impl WebStorage {
    pub fn new() -> Result<Self, StorageError> {
        let window = web_sys::window().ok_or(StorageError::Unavailable)?;
        Ok(Self {
            window,
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
        })
    }

    fn storage(&self) -> Result<Storage, StorageError> {
        self.window
            .local_storage()
            .map_err(storage_error)?
            .ok_or(StorageError::Unavailable)
    }

    fn document(&self) -> Result<HtmlDocument, StorageError> {
        self.window
            .document()
            .ok_or(StorageError::Unavailable)?
            .dyn_into::<HtmlDocument>()
            .map_err(|_| StorageError::Unavailable)
    }
}

impl StorageHost for WebStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?.get_item(key).map_err(storage_error)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?.set_item(key, value).map_err(storage_error)
    }

    fn get_cookie(&self, name: &str) -> Result<Option<String>, StorageError> {
        let jar = self.document()?.cookie().map_err(storage_error)?;
        for pair in jar.split("; ") {
            let Some((raw_name, raw_value)) = pair.split_once('=') else {
                continue;
            };
            let decoded_name = js_sys::decode_uri_component(raw_name)
                .map(String::from)
                .unwrap_or_else(|_| raw_name.to_string());
            if decoded_name == name {
                let value = js_sys::decode_uri_component(raw_value)
                    .map(String::from)
                    .map_err(storage_error)?;
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn set_cookie(&self, name: &str, value: &str) -> Result<(), StorageError> {
        let cookie = cookie_string(
            &String::from(js_sys::encode_uri_component(name)),
            &String::from(js_sys::encode_uri_component(value)),
        );
        self.document()?.set_cookie(&cookie).map_err(storage_error)
    }

    fn subscribe_changes(&self, handler: ChangeHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);

        let closure = EventClosure::new(move |_event: Event| handler());
        listen(&self.window, "storage", &closure);
        self.listeners.borrow_mut().insert(id, closure);
        id
    }

    fn unsubscribe_changes(&self, id: ListenerId) {
        if let Some(closure) = self.listeners.borrow_mut().remove(&id) {
            unlisten(&self.window, "storage", &closure);
        }
    }
}

impl Drop for WebStorage {
    fn drop(&mut self) {
        for (_, closure) in self.listeners.borrow_mut().drain() {
            unlisten(&self.window, "storage", &closure);
        }
    }
}

fn event_name(kind: PointerEventKind) -> &'static str {
    match kind {
        PointerEventKind::Move => "mousemove",
        PointerEventKind::Enter => "mouseenter",
        PointerEventKind::Leave => "mouseleave",
    }
}

fn pointer_event(kind: PointerEventKind, event: &Event) -> PointerEvent {
    match kind {
        PointerEventKind::Move => {
            let mouse = event.dyn_ref::<MouseEvent>();
            PointerEvent::Move(PointerMove {
                client_x: mouse.map(|m| f64::from(m.client_x())),
                client_y: mouse.map(|m| f64::from(m.client_y())),
            })
        }
        PointerEventKind::Enter => PointerEvent::Enter,
        PointerEventKind::Leave => PointerEvent::Leave,
    }
}

/// A DOM element reporting mouse events.
pub struct WebElement {
    element: Element,
    listeners: RefCell<HashMap<ListenerId, (PointerEventKind, EventClosure)>>,
    next_listener: Cell<u64>,
}

impl WebElement {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
        }
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl PointerTarget for WebElement {
    fn bounding_box(&self) -> Option<BoundingBox> {
        let rect = self.element.get_bounding_client_rect();
        Some(BoundingBox::new(rect.left(), rect.top(), rect.width(), rect.height()))
    }

    fn client_size(&self) -> Option<ClientSize> {
        Some(ClientSize {
            width: f64::from(self.element.client_width()),
            height: f64::from(self.element.client_height()),
        })
    }

    fn add_pointer_listener(&self, kind: PointerEventKind, handler: PointerHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);

        let closure = EventClosure::new(move |event: Event| handler(&pointer_event(kind, &event)));
        listen(&self.element, event_name(kind), &closure);
        self.listeners.borrow_mut().insert(id, (kind, closure));
        id
    }

    fn remove_pointer_listener(&self, id: ListenerId) {
        if let Some((kind, closure)) = self.listeners.borrow_mut().remove(&id) {
            unlisten(&self.element, event_name(kind), &closure);
        }
    }
}

impl Drop for WebElement {
    fn drop(&mut self) {
        for (_, (kind, closure)) in self.listeners.borrow_mut().drain() {
            unlisten(&self.element, event_name(kind), &closure);
        }
    }
}

struct ScheduledTimer {
    handle: i32,
    fired: Rc<Cell<bool>>,
    _closure: Closure<dyn FnMut()>,
}

/// `window.setTimeout` / `window.clearTimeout`.
pub struct WindowTimers {
    window: Window,
    timers: RefCell<HashMap<u64, ScheduledTimer>>,
    next_id: Cell<u64>,
}

impl WindowTimers {
    pub fn new() -> Option<Self> {
        Some(Self {
            window: web_sys::window()?,
            timers: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        })
    }
}

impl TimerHost for WindowTimers {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
        // Closures of fired timers are released lazily here.
        self.timers.borrow_mut().retain(|_, timer| !timer.fired.get());

        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let fired = Rc::new(Cell::new(false));
        let slot = RefCell::new(Some(callback));
        let closure = Closure::<dyn FnMut()>::new({
            let fired = Rc::clone(&fired);
            move || {
                let callback = slot.borrow_mut().take();
                if let Some(callback) = callback {
                    callback();
                }
                // Marked after the call so a nested set_timeout never drops
                // the closure that is still running.
                fired.set(true);
            }
        });

        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                millis,
            ) {
            Ok(handle) => {
                self.timers.borrow_mut().insert(
                    id,
                    ScheduledTimer {
                        handle,
                        fired,
                        _closure: closure,
                    },
                );
            }
            Err(err) => tracing::warn!(?err, "setTimeout failed; callback dropped"),
        }
        TimerId(id)
    }

    fn clear_timeout(&self, id: TimerId) {
        if let Some(timer) = self.timers.borrow_mut().remove(&id.0) {
            self.window.clear_timeout_with_handle(timer.handle);
        }
    }
}

impl Drop for WindowTimers {
    fn drop(&mut self) {
        for (_, timer) in self.timers.borrow_mut().drain() {
            self.window.clear_timeout_with_handle(timer.handle);
        }
    }
}

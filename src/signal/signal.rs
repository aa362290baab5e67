use crate::runtime::{ReactiveRuntime, RuntimeInner};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A reactive signal that holds a value and notifies subscribers when changed.
pub struct Signal<T> {
    value: Rc<RefCell<T>>,
    id: usize,
    runtime: Weak<RuntimeInner>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            id: self.id,
            runtime: Weak::clone(&self.runtime),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*self.value.borrow())
            .finish()
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(initial: T) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.inner().next_id();

        Self {
            value: Rc::new(RefCell::new(initial)),
            id,
            runtime: runtime.downgrade(),
        }
    }

    /// Get the current value of the signal, tracking the read.
    pub fn get(&self) -> T {
        self.track();
        self.value.borrow().clone()
    }

    /// Get the current value without registering a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.borrow().clone()
    }

    /// Set a new value for the signal.
    pub fn set(&self, new_value: T) {
        *self.value.borrow_mut() = new_value;
        self.notify();
    }

    /// Update the value using a function.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.value.borrow_mut());
        self.notify();
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&*self.value.borrow())
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Watch this signal for changes.
    ///
    /// The callback runs immediately with the current value and again after
    /// every `set`/`update`, until the returned guard is dropped.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + 'static,
    {
        let Some(runtime) = self.runtime.upgrade() else {
            callback(self.get_untracked());
            return WatchGuard {
                observer_id: None,
                runtime: Weak::new(),
            };
        };

        let observer_id = runtime.next_id();
        let value = Rc::downgrade(&self.value);
        let callback = Rc::new(callback);
        let callback_clone = Rc::clone(&callback);

        runtime.create_observer(observer_id, move || {
            if let Some(value) = value.upgrade() {
                let val = value.borrow().clone();
                callback_clone(val);
            }
        });

        // Subscribe to this signal
        runtime.with_observer(Some(observer_id), || runtime.track_read(self.id));

        callback(self.get_untracked());

        WatchGuard {
            observer_id: Some(observer_id),
            runtime: Rc::downgrade(&runtime),
        }
    }

    fn track(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.track_read(self.id);
        }
    }

    fn notify(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.notify_observers(self.id);
        }
    }
}

/// RAII guard for signal watchers.
#[must_use = "dropping the guard stops the watcher"]
pub struct WatchGuard {
    observer_id: Option<usize>,
    runtime: Weak<RuntimeInner>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let (Some(id), Some(runtime)) = (self.observer_id, self.runtime.upgrade()) {
            runtime.remove_observer(id);
        }
    }
}

/// Read half of a signal created by [`create_signal`].
pub struct ReadSignal<T>(Signal<T>);

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.0).finish()
    }
}

impl<T: Clone + 'static> ReadSignal<T> {
    pub fn get(&self) -> T {
        self.0.get()
    }

    pub fn get_untracked(&self) -> T {
        self.0.get_untracked()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }

    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + 'static,
    {
        self.0.watch(callback)
    }

    pub fn id(&self) -> usize {
        self.0.id()
    }
}

/// Write half of a signal created by [`create_signal`].
pub struct WriteSignal<T>(Signal<T>);

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone + 'static> WriteSignal<T> {
    pub fn set(&self, new_value: T) {
        self.0.set(new_value);
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.0.update(f);
    }
}

/// Create a signal split into read and write halves.
///
/// # Example
///
/// ```
/// use tincan_hooks::create_signal;
///
/// let (count, set_count) = create_signal(0);
/// set_count.set(3);
/// assert_eq!(count.get(), 3);
/// ```
pub fn create_signal<T: Clone + 'static>(initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
    let signal = Signal::new(initial);
    (ReadSignal(signal.clone()), WriteSignal(signal))
}

impl<T> From<Signal<T>> for ReadSignal<T> {
    fn from(signal: Signal<T>) -> Self {
        ReadSignal(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn signal_basic() {
        let signal = Signal::new(5);
        assert_eq!(signal.get(), 5);
        signal.set(7);
        assert_eq!(signal.get(), 7);
        signal.update(|n| *n *= 2);
        assert_eq!(signal.with(|n| *n + 1), 15);
    }

    #[test]
    fn watch_runs_immediately_then_on_change() {
        let signal = Signal::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let guard = signal.watch({
            let seen = seen.clone();
            move |v| seen.borrow_mut().push(v)
        });

        signal.set(2);
        signal.set(3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);

        drop(guard);
        signal.set(4);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn watcher_dropped_mid_notify_does_not_fire() {
        let signal = Signal::new(0);
        let hits = Rc::new(Cell::new(0));
        let guard: Rc<RefCell<Option<WatchGuard>>> = Rc::new(RefCell::new(None));

        // Observers run in creation order, so the effect runs before the watcher.
        let _effect = crate::create_effect({
            let signal = signal.clone();
            let guard = guard.clone();
            move || {
                if signal.get() == 1 {
                    guard.borrow_mut().take();
                }
            }
        });
        *guard.borrow_mut() = Some(signal.watch({
            let hits = hits.clone();
            move |_| hits.set(hits.get() + 1)
        }));
        assert_eq!(hits.get(), 1);

        signal.set(1);
        assert_eq!(hits.get(), 1);
        assert!(guard.borrow().is_none());
    }

    #[test]
    fn split_signal_shares_value() {
        let (read, write) = create_signal(String::from("a"));
        let hits = Rc::new(Cell::new(0));
        let _guard = read.watch({
            let hits = hits.clone();
            move |_| hits.set(hits.get() + 1)
        });

        write.update(|s| s.push('b'));
        assert_eq!(read.get(), "ab");
        assert_eq!(hits.get(), 2);
    }
}

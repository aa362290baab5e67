use crate::host::{TimerHost, TimerId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

struct DebounceState<T> {
    timers: Rc<dyn TimerHost>,
    delay: Duration,
    sink: Box<dyn Fn(T)>,
    pending: RefCell<Option<(TimerId, T)>>,
}

impl<T: 'static> DebounceState<T> {
    fn emit_pending(&self) {
        let pending = self.pending.borrow_mut().take();
        if let Some((_, arg)) = pending {
            (self.sink)(arg);
        }
    }

    fn cancel(&self) -> bool {
        let pending = self.pending.borrow_mut().take();
        match pending {
            Some((timer, _)) => {
                self.timers.clear_timeout(timer);
                true
            }
            None => false,
        }
    }
}

/// Trailing-edge debouncer.
///
/// Every [`call`](Debouncer::call) cancels the pending emission and
/// schedules a new one `delay` later; the sink only sees the argument of the
/// last call in a burst. Dropping the debouncer cancels any pending
/// emission.
///
/// # Examples
///
/// ```
/// use tincan_hooks::host::ManualTimers;
/// use tincan_hooks::pointer::Debouncer;
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let timers = ManualTimers::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let debouncer = Debouncer::new(Rc::new(timers.clone()), Duration::from_millis(10), {
///     let seen = seen.clone();
///     move |v: u32| seen.borrow_mut().push(v)
/// });
///
/// debouncer.call(1);
/// timers.advance(Duration::from_millis(5));
/// debouncer.call(2);
/// timers.advance(Duration::from_millis(10));
/// assert_eq!(*seen.borrow(), vec![2]);
/// ```
pub struct Debouncer<T> {
    state: Rc<DebounceState<T>>,
}

impl<T: 'static> Debouncer<T> {
    pub fn new(timers: Rc<dyn TimerHost>, delay: Duration, sink: impl Fn(T) + 'static) -> Self {
        Self {
            state: Rc::new(DebounceState {
                timers,
                delay,
                sink: Box::new(sink),
                pending: RefCell::new(None),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.state.delay
    }

    /// Schedule `arg` for emission, replacing whatever was pending.
    pub fn call(&self, arg: T) {
        self.state.cancel();

        let weak: Weak<DebounceState<T>> = Rc::downgrade(&self.state);
        let timer = self.state.timers.set_timeout(
            self.state.delay,
            Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    state.emit_pending();
                }
            }),
        );
        *self.state.pending.borrow_mut() = Some((timer, arg));
    }

    /// Drop the pending emission. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    /// Emit the pending argument now instead of waiting for the timer.
    pub fn flush(&self) {
        let pending = self.state.pending.borrow_mut().take();
        if let Some((timer, arg)) = pending {
            self.state.timers.clear_timeout(timer);
            (self.state.sink)(arg);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending.borrow().is_some()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let pending = self.state.pending.borrow_mut().take();
        if let Some((timer, _)) = pending {
            self.state.timers.clear_timeout(timer);
        }
    }
}

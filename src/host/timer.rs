//! A virtual-clock timer host.

use super::{TimerHost, TimerId};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

type Callback = Box<dyn FnOnce()>;

#[derive(Default)]
struct TimerState {
    now: Duration,
    next_id: u64,
    // Keyed by (due time, id) so equal deadlines fire in scheduling order.
    queue: BTreeMap<(Duration, u64), Callback>,
    due_by_id: BTreeMap<u64, Duration>,
}

/// Timers that only fire when the clock is advanced by hand.
///
/// ```
/// use tincan_hooks::host::{ManualTimers, TimerHost};
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let timers = ManualTimers::new();
/// let fired = Rc::new(Cell::new(false));
/// timers.set_timeout(Duration::from_millis(10), Box::new({
///     let fired = fired.clone();
///     move || fired.set(true)
/// }));
///
/// timers.advance(Duration::from_millis(9));
/// assert!(!fired.get());
/// timers.advance(Duration::from_millis(1));
/// assert!(fired.get());
/// ```
#[derive(Clone, Default)]
pub struct ManualTimers {
    state: Rc<RefCell<TimerState>>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Move the clock forward, firing every timer that comes due, in order.
    ///
    /// Timers scheduled by a firing callback also fire if they fall due
    /// before the new time.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due = match state.queue.first_key_value() {
                    Some((&(due, _), _)) if due <= target => due,
                    _ => break,
                };
                let ((_, id), callback) = match state.queue.pop_first() {
                    Some(entry) => entry,
                    None => break,
                };
                state.due_by_id.remove(&id);
                state.now = due;
                callback
            };
            next();
        }
        self.state.borrow_mut().now = target;
    }
}

impl TimerHost for ManualTimers {
    fn set_timeout(&self, delay: Duration, callback: Callback) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.queue.insert((due, id), callback);
        state.due_by_id.insert(id, due);
        TimerId(id)
    }

    fn clear_timeout(&self, id: TimerId) {
        let mut state = self.state.borrow_mut();
        if let Some(due) = state.due_by_id.remove(&id.0) {
            state.queue.remove(&(due, id.0));
        }
    }
}

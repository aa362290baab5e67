use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Cleanup = Box<dyn FnOnce()>;

/// A list of cleanups run in reverse registration order.
#[derive(Default)]
pub(crate) struct CleanupList {
    cleanups: RefCell<Vec<Cleanup>>,
}

impl CleanupList {
    pub(crate) fn push(&self, cleanup: Cleanup) {
        self.cleanups.borrow_mut().push(cleanup);
    }

    pub(crate) fn run(&self) {
        // Cleanups may register further cleanups; drain until empty.
        loop {
            let next = self.cleanups.borrow_mut().pop();
            match next {
                Some(cleanup) => cleanup(),
                None => break,
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.cleanups.borrow().len()
    }
}

thread_local! {
    static CLEANUP_TARGETS: RefCell<Vec<Weak<CleanupList>>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` with `target` receiving every [`on_cleanup`] call made inside it.
pub(crate) fn with_cleanup_target<R>(target: &Rc<CleanupList>, f: impl FnOnce() -> R) -> R {
    CLEANUP_TARGETS.with(|stack| stack.borrow_mut().push(Rc::downgrade(target)));

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    CLEANUP_TARGETS.with(|stack| {
        stack.borrow_mut().pop();
    });

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

/// Register a cleanup with the innermost running effect or owner.
///
/// Inside an effect the cleanup runs before the effect's next run and when
/// the effect is dropped. Inside [`Owner::run`] it runs when the owner is
/// disposed. With neither active the cleanup is dropped without running.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) {
    let target = CLEANUP_TARGETS.with(|stack| stack.borrow().last().and_then(Weak::upgrade));
    match target {
        Some(target) => target.push(Box::new(cleanup)),
        None => tracing::debug!("on_cleanup called outside of an owner or effect; ignoring"),
    }
}

struct OwnerState {
    cleanups: Rc<CleanupList>,
    disposed: Cell<bool>,
}

impl Drop for OwnerState {
    fn drop(&mut self) {
        if !self.disposed.replace(true) {
            self.cleanups.run();
        }
    }
}

/// The lifetime of a mounted component.
///
/// Hooks called inside [`Owner::run`] tie their listeners, timers and
/// effects to the owner; [`Owner::dispose`] tears all of it down. Dropping
/// the last handle to an owner disposes it.
///
/// # Examples
///
/// ```
/// use tincan_hooks::runtime::{on_cleanup, Owner};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let unmounted = Rc::new(Cell::new(false));
/// let owner = Owner::new();
/// owner.run({
///     let unmounted = unmounted.clone();
///     move || on_cleanup(move || unmounted.set(true))
/// });
///
/// owner.dispose();
/// assert!(unmounted.get());
/// ```
#[derive(Clone)]
pub struct Owner {
    state: Rc<OwnerState>,
}

impl Owner {
    pub fn new() -> Self {
        Self {
            state: Rc::new(OwnerState {
                cleanups: Rc::new(CleanupList::default()),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Run `f` with this owner collecting cleanups.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.is_disposed() {
            tracing::debug!("running inside a disposed owner; cleanups will not be collected");
        }
        with_cleanup_target(&self.state.cleanups, f)
    }

    /// Run every registered cleanup, newest first. Idempotent.
    pub fn dispose(&self) {
        if self.state.disposed.replace(true) {
            return;
        }
        tracing::debug!(cleanups = self.state.cleanups.len(), "disposing owner");
        self.state.cleanups.run();
    }

    pub fn is_disposed(&self) -> bool {
        self.state.disposed.get()
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanups_run_newest_first_and_only_once() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let owner = Owner::new();
        owner.run(|| {
            for i in 0..3 {
                let order = order.clone();
                on_cleanup(move || order.borrow_mut().push(i));
            }
        });

        owner.dispose();
        owner.dispose();
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
        assert!(owner.is_disposed());
    }

    #[test]
    fn dropping_last_handle_disposes() {
        let ran = Rc::new(Cell::new(false));
        {
            let owner = Owner::new();
            let ran = ran.clone();
            owner.run(move || on_cleanup(move || ran.set(true)));
        }
        assert!(ran.get());
    }

    #[test]
    fn nested_owners_collect_their_own_cleanups() {
        let outer_ran = Rc::new(Cell::new(false));
        let inner_ran = Rc::new(Cell::new(false));
        let outer = Owner::new();
        let inner = Owner::new();

        outer.run(|| {
            let outer_ran = outer_ran.clone();
            on_cleanup(move || outer_ran.set(true));
            inner.run(|| {
                let inner_ran = inner_ran.clone();
                on_cleanup(move || inner_ran.set(true));
            });
        });

        inner.dispose();
        assert!(inner_ran.get());
        assert!(!outer_ran.get());
        outer.dispose();
        assert!(outer_ran.get());
    }

    #[test]
    fn cleanup_outside_any_owner_is_ignored() {
        on_cleanup(|| panic!("must not run"));
    }
}

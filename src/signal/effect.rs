use crate::runtime::{with_cleanup_target, CleanupList, ReactiveRuntime, RuntimeInner};
use std::cell::Cell;
use std::rc::{Rc, Weak};

struct EffectState {
    id: usize,
    run: Box<dyn Fn()>,
    cleanups: Rc<CleanupList>,
    runtime: Weak<RuntimeInner>,
    disposed: Cell<bool>,
}

impl EffectState {
    fn execute(&self) {
        if self.disposed.get() {
            return;
        }
        // Previous run's cleanups go first so listeners never overlap.
        self.cleanups.run();

        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };
        // Dependencies are re-tracked from scratch on every run.
        runtime.clear_observer_deps(self.id);
        with_cleanup_target(&self.cleanups, || {
            runtime.with_observer(Some(self.id), || (self.run)());
        });
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_observer(self.id);
        }
        self.cleanups.run();
    }
}

/// A side effect that runs when its dependencies change.
///
/// Effects automatically track signal reads and re-run when those signals
/// change. The effect runs immediately on creation to establish initial
/// dependencies. Cleanups registered with
/// [`on_cleanup`](crate::runtime::on_cleanup) while the effect runs are
/// executed before the next run and when the effect is dropped.
///
/// # Examples
///
/// ```
/// use tincan_hooks::{Effect, Signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = Signal::new(0);
/// let runs = Rc::new(Cell::new(0));
///
/// let _effect = Effect::new({
///     let count = count.clone();
///     let runs = runs.clone();
///     move || {
///         let _ = count.get();
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// // Effect runs immediately
/// assert_eq!(runs.get(), 1);
///
/// count.set(5);
/// assert_eq!(runs.get(), 2);
/// ```
#[must_use = "dropping an effect disposes it"]
pub struct Effect {
    state: Rc<EffectState>,
}

impl Effect {
    /// Create a new effect that runs when dependencies change.
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn() + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let id = runtime.inner().next_id();
        let state = Rc::new(EffectState {
            id,
            run: Box::new(effect),
            cleanups: Rc::new(CleanupList::default()),
            runtime: runtime.downgrade(),
            disposed: Cell::new(false),
        });

        // The runtime holds only a weak handle; the effect owns its state.
        let weak = Rc::downgrade(&state);
        runtime.inner().create_observer(id, move || {
            if let Some(state) = weak.upgrade() {
                state.execute();
            }
        });

        state.execute();

        Self { state }
    }

    /// Manually re-run the effect.
    pub fn run(&self) {
        self.state.execute();
    }

    /// Stop the effect and run its pending cleanups.
    pub fn dispose(&self) {
        self.state.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.state.disposed.get()
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        self.state.dispose();
    }
}

/// Create a new effect that runs when dependencies change.
///
/// The effect runs immediately and then again whenever any signal
/// it reads changes.
///
/// # Example
///
/// ```
/// use tincan_hooks::{create_effect, create_signal};
///
/// let (count, set_count) = create_signal(0);
///
/// let _effect = create_effect(move || {
///     println!("Count is: {}", count.get());
/// });
/// set_count.set(1);
/// ```
pub fn create_effect<F>(effect: F) -> Effect
where
    F: Fn() + 'static,
{
    Effect::new(effect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::on_cleanup;
    use crate::signal::Signal;
    use std::cell::RefCell;

    #[test]
    fn effect_runs_immediately() {
        let counter = Rc::new(Cell::new(0));
        let _effect = create_effect({
            let counter = counter.clone();
            move || counter.set(counter.get() + 1)
        });

        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn cleanup_runs_before_rerun_and_on_drop() {
        let signal = Signal::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let effect = create_effect({
            let signal = signal.clone();
            let log = log.clone();
            move || {
                let v = signal.get();
                log.borrow_mut().push(format!("run {v}"));
                let log = log.clone();
                on_cleanup(move || log.borrow_mut().push(format!("cleanup {v}")));
            }
        });

        signal.set(1);
        drop(effect);
        signal.set(2);

        assert_eq!(
            *log.borrow(),
            vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
        );
    }

    #[test]
    fn dependencies_are_retracked_each_run() {
        let use_a = Signal::new(true);
        let a = Signal::new(0);
        let b = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        let _effect = create_effect({
            let (use_a, a, b, runs) = (use_a.clone(), a.clone(), b.clone(), runs.clone());
            move || {
                runs.set(runs.get() + 1);
                if use_a.get() {
                    a.get();
                } else {
                    b.get();
                }
            }
        });

        use_a.set(false);
        assert_eq!(runs.get(), 2);
        a.set(1);
        assert_eq!(runs.get(), 2);
        b.set(1);
        assert_eq!(runs.get(), 3);
    }
}

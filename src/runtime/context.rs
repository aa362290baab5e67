use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

type ObserverFn = Rc<dyn Fn()>;

/// Reactive context for tracking dependencies.
struct ReactiveContext {
    current_observer: Option<usize>,
    // Map from signal ID to set of observer IDs that depend on it
    dependencies: HashMap<usize, HashSet<usize>>,
    // Map from observer ID to set of signal IDs it depends on
    observer_deps: HashMap<usize, HashSet<usize>>,
    // Map from observer ID to the function re-run on change
    observers: HashMap<usize, ObserverFn>,
}

impl ReactiveContext {
    fn new() -> Self {
        Self {
            current_observer: None,
            dependencies: HashMap::new(),
            observer_deps: HashMap::new(),
            observers: HashMap::new(),
        }
    }

    fn clear(&mut self) {
        self.current_observer = None;
        self.dependencies.clear();
        self.observer_deps.clear();
        self.observers.clear();
    }

    fn clear_observer_deps(&mut self, observer_id: usize) {
        if let Some(old_deps) = self.observer_deps.remove(&observer_id) {
            for signal_id in old_deps {
                if let Some(deps) = self.dependencies.get_mut(&signal_id) {
                    deps.remove(&observer_id);
                    if deps.is_empty() {
                        self.dependencies.remove(&signal_id);
                    }
                }
            }
        }
    }
}

/// Inner runtime state shared between the runtime handle and the primitives
/// created in it.
pub struct RuntimeInner {
    next_id: Cell<usize>,
    context: RefCell<ReactiveContext>,
}

impl RuntimeInner {
    fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            context: RefCell::new(ReactiveContext::new()),
        }
    }

    pub(crate) fn next_id(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub(crate) fn remove_observer(&self, observer_id: usize) {
        let mut ctx = self.context.borrow_mut();
        ctx.observers.remove(&observer_id);
        ctx.clear_observer_deps(observer_id);
    }

    pub(crate) fn clear_observer_deps(&self, observer_id: usize) {
        self.context.borrow_mut().clear_observer_deps(observer_id);
    }

    pub(crate) fn track_read(&self, signal_id: usize) {
        let mut ctx = self.context.borrow_mut();
        if let Some(current_observer) = ctx.current_observer {
            // Add dependency: signal -> observer
            ctx.dependencies
                .entry(signal_id)
                .or_default()
                .insert(current_observer);
            // Track that this observer depends on this signal
            ctx.observer_deps
                .entry(current_observer)
                .or_default()
                .insert(signal_id);
        }
    }

    pub(crate) fn notify_observers(&self, signal_id: usize) {
        // Collect ids first: observers may read or write signals while running.
        let ids: Vec<usize> = {
            let ctx = self.context.borrow();
            let Some(ids) = ctx.dependencies.get(&signal_id) else {
                return;
            };
            let mut ids: Vec<usize> = ids.iter().copied().collect();
            ids.sort_unstable();
            ids
        };

        for id in ids {
            // An earlier observer in this pass may have removed this one.
            let observer = self.context.borrow().observers.get(&id).cloned();
            if let Some(observer) = observer {
                observer();
            }
        }
    }

    pub(crate) fn create_observer(&self, observer_id: usize, f: impl Fn() + 'static) {
        let mut ctx = self.context.borrow_mut();
        ctx.clear_observer_deps(observer_id);
        ctx.observers.insert(observer_id, Rc::new(f));
    }

    pub(crate) fn with_observer<R>(&self, observer: Option<usize>, f: impl FnOnce() -> R) -> R {
        let prev = std::mem::replace(&mut self.context.borrow_mut().current_observer, observer);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
        self.context.borrow_mut().current_observer = prev;

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    fn observer_count(&self) -> usize {
        self.context.borrow().observers.len()
    }

    fn clear(&self) {
        self.context.borrow_mut().clear();
        self.next_id.set(0);
    }
}

/// Reactive runtime for managing reactive primitives.
///
/// Supports both a per-thread default runtime and scoped runtimes for
/// isolation. The runtime tracks dependencies between signals and their
/// observers (effects and watchers) and re-runs observers on change.
///
/// The runtime is single-threaded: every primitive created in it is
/// `!Send` and must stay on the thread that created it.
///
/// # Examples
///
/// Using the default runtime:
///
/// ```
/// use tincan_hooks::Signal;
///
/// let signal = Signal::new(42);
/// assert_eq!(signal.get(), 42);
/// ```
///
/// Using scoped runtimes for isolation:
///
/// ```
/// use tincan_hooks::runtime::ReactiveRuntime;
/// use tincan_hooks::Signal;
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.get(), 0);
/// });
/// // Runtime and all its state is dropped here
/// ```
#[derive(Clone)]
pub struct ReactiveRuntime {
    inner: Rc<RuntimeInner>,
}

thread_local! {
    static DEFAULT_RUNTIME: ReactiveRuntime = ReactiveRuntime::new();
    static RUNTIME_STACK: RefCell<Vec<ReactiveRuntime>> = const { RefCell::new(Vec::new()) };
}

impl ReactiveRuntime {
    /// Create a new isolated runtime.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new()),
        }
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// The runtime and all its state is cleaned up when the function
    /// returns, unless primitives created inside escape the closure.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(), f)
    }

    /// The default runtime of the current thread.
    pub fn global() -> Self {
        DEFAULT_RUNTIME.with(Clone::clone)
    }

    /// Get the current reactive runtime (scoped or the thread default).
    pub fn current() -> Self {
        RUNTIME_STACK.with(|stack| stack.borrow().last().cloned())
            .unwrap_or_else(Self::global)
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// ```
    /// use tincan_hooks::runtime::ReactiveRuntime;
    /// use tincan_hooks::Signal;
    ///
    /// let runtime = ReactiveRuntime::new();
    /// ReactiveRuntime::with_runtime(runtime, || {
    ///     let signal = Signal::new(42);
    ///     assert_eq!(signal.get(), 42);
    /// });
    /// ```
    pub fn with_runtime<F, R>(runtime: Self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| stack.borrow_mut().push(runtime));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Clear all observers, dependencies and the ID counter.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Number of live observers (effects and watchers) in this runtime.
    pub fn observer_count(&self) -> usize {
        self.inner.observer_count()
    }

    pub(crate) fn inner(&self) -> &Rc<RuntimeInner> {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }
}

impl Default for ReactiveRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `f` without recording any signal reads as dependencies.
///
/// ```
/// use tincan_hooks::runtime::untrack;
/// use tincan_hooks::{create_effect, Signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let signal = Signal::new(1);
/// let runs = Rc::new(Cell::new(0));
/// let _effect = create_effect({
///     let signal = signal.clone();
///     let runs = runs.clone();
///     move || {
///         untrack(|| signal.get());
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// signal.set(2);
/// assert_eq!(runs.get(), 1);
/// ```
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    ReactiveRuntime::current().inner.with_observer(None, f)
}

use super::coords::relative_xy;
use super::debounce::Debouncer;
use crate::config::{TrackerOptions, DEFAULT_POINTER_DELAY};
use crate::host::{PointerEvent, PointerEventKind, PointerHandler, PointerTarget, TimerHost};
use crate::runtime::on_cleanup;
use crate::signal::{create_effect, create_signal, Effect, ReadSignal, Signal};
use std::rc::Rc;
use std::time::Duration;

/// A reactive, possibly unbound, reference to a pointer target.
///
/// Hooks that take a `NodeRef` rebind whenever it changes.
#[derive(Clone)]
pub struct NodeRef {
    target: Signal<Option<Rc<dyn PointerTarget>>>,
}

impl NodeRef {
    pub fn new() -> Self {
        Self {
            target: Signal::new(None),
        }
    }

    pub fn bind(&self, target: Rc<dyn PointerTarget>) {
        self.target.set(Some(target));
    }

    pub fn unbind(&self) {
        self.target.set(None);
    }

    /// The bound target, tracked by the running effect.
    pub fn get(&self) -> Option<Rc<dyn PointerTarget>> {
        self.target.get()
    }

    pub fn is_bound(&self) -> bool {
        self.target.get_untracked().is_some()
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Pointer position relative to a [`NodeRef`], plus hover state.
#[derive(Clone)]
pub struct RelativePointer {
    coords: ReadSignal<(f64, f64)>,
    is_within: ReadSignal<bool>,
    effect: Rc<Effect>,
}

impl RelativePointer {
    pub fn x(&self) -> f64 {
        self.coords.with(|(x, _)| *x)
    }

    pub fn y(&self) -> f64 {
        self.coords.with(|(_, y)| *y)
    }

    pub fn is_within(&self) -> bool {
        self.is_within.get()
    }

    /// `(x, y, is_within)`.
    pub fn get(&self) -> (f64, f64, bool) {
        let (x, y) = self.coords.get();
        (x, y, self.is_within.get())
    }

    pub fn coords(&self) -> ReadSignal<(f64, f64)> {
        self.coords.clone()
    }

    pub fn within(&self) -> ReadSignal<bool> {
        self.is_within.clone()
    }

    /// Detach from the element and cancel any pending update.
    pub fn stop(&self) {
        self.effect.dispose();
    }
}

/// Track the pointer relative to `node`.
///
/// Moves are debounced by `delay` (`None` means 60 Hz; zero is honoured).
/// Enter and leave update [`RelativePointer::is_within`] immediately.
/// Listeners follow the element bound to `node` and are removed when the
/// current [`Owner`](crate::runtime::Owner) is disposed.
///
/// # Examples
///
/// ```
/// use tincan_hooks::host::{BoundingBox, ManualTimers, MemoryElement, PointerEvent, PointerMove};
/// use tincan_hooks::pointer::{use_relative_pointer, NodeRef};
/// use tincan_hooks::runtime::Owner;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let timers = ManualTimers::new();
/// let element = MemoryElement::new(BoundingBox::new(10.0, 20.0, 100.0, 50.0));
/// let node = NodeRef::new();
/// node.bind(Rc::new(element.clone()));
///
/// let owner = Owner::new();
/// let pointer = owner.run(|| use_relative_pointer(&node, Rc::new(timers.clone()), None));
///
/// element.dispatch(PointerEvent::Enter);
/// element.dispatch(PointerEvent::Move(PointerMove::at(200.0, 30.0)));
/// timers.advance(Duration::from_millis(17));
/// assert_eq!(pointer.get(), (100.0, 10.0, true));
/// ```
pub fn use_relative_pointer(
    node: &NodeRef,
    timers: Rc<dyn TimerHost>,
    delay: Option<Duration>,
) -> RelativePointer {
    let delay = delay.unwrap_or(DEFAULT_POINTER_DELAY);
    let (coords, set_coords) = create_signal((0.0, 0.0));
    let (is_within, set_within) = create_signal(false);

    let node = node.clone();
    let effect = create_effect(move || {
        let Some(target) = node.get() else {
            tracing::debug!("pointer target unbound; no listeners attached");
            return;
        };

        let debouncer = Rc::new(Debouncer::new(Rc::clone(&timers), delay, {
            let set_coords = set_coords.clone();
            move |xy: (f64, f64)| set_coords.set(xy)
        }));

        let weak_target = Rc::downgrade(&target);
        let on_move: PointerHandler = Rc::new({
            let debouncer = Rc::clone(&debouncer);
            move |event: &PointerEvent| {
                if let PointerEvent::Move(movement) = event {
                    let (bounds, size) = match weak_target.upgrade() {
                        Some(target) => (target.bounding_box(), target.client_size()),
                        None => (None, None),
                    };
                    debouncer.call(relative_xy(movement, bounds, size));
                }
            }
        });
        let on_enter: PointerHandler = Rc::new({
            let set_within = set_within.clone();
            move |_: &PointerEvent| set_within.set(true)
        });
        let on_leave: PointerHandler = Rc::new({
            let set_within = set_within.clone();
            move |_: &PointerEvent| set_within.set(false)
        });

        let ids = [
            (PointerEventKind::Move, on_move),
            (PointerEventKind::Enter, on_enter),
            (PointerEventKind::Leave, on_leave),
        ]
        .map(|(kind, handler)| target.add_pointer_listener(kind, handler));
        tracing::debug!(?delay, "pointer listeners attached");

        on_cleanup(move || {
            for id in ids {
                target.remove_pointer_listener(id);
            }
            if debouncer.cancel() {
                tracing::trace!("pending pointer update cancelled");
            }
            tracing::debug!("pointer listeners detached");
        });
    });

    let effect = Rc::new(effect);
    on_cleanup({
        let effect = Rc::clone(&effect);
        move || effect.dispose()
    });

    RelativePointer {
        coords,
        is_within,
        effect,
    }
}

/// [`use_relative_pointer`] configured from [`TrackerOptions`].
pub fn use_relative_pointer_with_options(
    node: &NodeRef,
    timers: Rc<dyn TimerHost>,
    options: &TrackerOptions,
) -> RelativePointer {
    use_relative_pointer(node, timers, Some(options.delay()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BoundingBox, ManualTimers, MemoryElement, PointerMove};
    use crate::runtime::Owner;
    use std::cell::Cell;

    const FRAME: Duration = Duration::from_millis(17);

    fn setup() -> (ManualTimers, MemoryElement, NodeRef) {
        let timers = ManualTimers::new();
        let element = MemoryElement::new(BoundingBox::new(10.0, 20.0, 100.0, 50.0));
        let node = NodeRef::new();
        node.bind(Rc::new(element.clone()));
        (timers, element, node)
    }

    fn move_to(element: &MemoryElement, x: f64, y: f64) {
        element.dispatch(PointerEvent::Move(PointerMove::at(x, y)));
    }

    #[test]
    fn starts_at_origin_outside() {
        let (timers, _element, node) = setup();
        let owner = Owner::new();
        let pointer = owner.run(|| use_relative_pointer(&node, Rc::new(timers), None));
        assert_eq!(pointer.get(), (0.0, 0.0, false));
    }

    #[test]
    fn burst_of_moves_produces_one_update() {
        let (timers, element, node) = setup();
        let owner = Owner::new();
        let pointer = owner.run(|| use_relative_pointer(&node, Rc::new(timers.clone()), None));

        let updates = Rc::new(Cell::new(0));
        let _guard = pointer.coords().watch({
            let updates = updates.clone();
            move |_| updates.set(updates.get() + 1)
        });
        assert_eq!(updates.get(), 1);

        for i in 0..20 {
            move_to(&element, 20.0 + i as f64, 30.0);
            timers.advance(Duration::from_millis(2));
        }
        assert_eq!(pointer.get(), (0.0, 0.0, false));

        timers.advance(FRAME);
        assert_eq!(updates.get(), 2);
        assert_eq!((pointer.x(), pointer.y()), (29.0, 10.0));
    }

    #[test]
    fn enter_and_leave_bypass_the_debounce() {
        let (timers, element, node) = setup();
        let owner = Owner::new();
        let pointer = owner.run(|| use_relative_pointer(&node, Rc::new(timers.clone()), None));

        move_to(&element, 50.0, 40.0);
        element.dispatch(PointerEvent::Enter);
        assert!(pointer.is_within());
        element.dispatch(PointerEvent::Leave);
        assert!(!pointer.is_within());
        assert_eq!((pointer.x(), pointer.y()), (0.0, 0.0));

        timers.advance(FRAME);
        assert_eq!((pointer.x(), pointer.y()), (40.0, 20.0));
    }

    #[test]
    fn zero_delay_is_honoured() {
        let (timers, element, node) = setup();
        let owner = Owner::new();
        let pointer = owner.run(|| {
            use_relative_pointer(&node, Rc::new(timers.clone()), Some(Duration::ZERO))
        });

        move_to(&element, 15.0, 25.0);
        timers.advance(Duration::ZERO);
        assert_eq!((pointer.x(), pointer.y()), (5.0, 5.0));
    }

    #[test]
    fn unbound_ref_attaches_nothing_until_bound() {
        let timers = ManualTimers::new();
        let element = MemoryElement::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        let node = NodeRef::new();
        let owner = Owner::new();
        let pointer = owner.run(|| use_relative_pointer(&node, Rc::new(timers.clone()), None));

        move_to(&element, 5.0, 5.0);
        assert_eq!(element.listener_count(), 0);

        node.bind(Rc::new(element.clone()));
        assert_eq!(element.listener_count(), 3);
        move_to(&element, 5.0, 5.0);
        timers.advance(FRAME);
        assert_eq!((pointer.x(), pointer.y()), (5.0, 5.0));
    }

    #[test]
    fn rebinding_moves_listeners_and_cancels_pending_update() {
        let (timers, first, node) = setup();
        let owner = Owner::new();
        let pointer = owner.run(|| use_relative_pointer(&node, Rc::new(timers.clone()), None));

        move_to(&first, 60.0, 40.0);
        let second = MemoryElement::new(BoundingBox::new(0.0, 0.0, 20.0, 20.0));
        node.bind(Rc::new(second.clone()));

        assert_eq!(first.listener_count(), 0);
        assert_eq!(second.listener_count(), 3);
        timers.advance(FRAME);
        assert_eq!((pointer.x(), pointer.y()), (0.0, 0.0));

        move_to(&second, 30.0, 5.0);
        timers.advance(FRAME);
        assert_eq!((pointer.x(), pointer.y()), (20.0, 5.0));
    }

    #[test]
    fn teardown_removes_listeners_and_stops_updates() {
        let (timers, element, node) = setup();
        let owner = Owner::new();
        let pointer = owner.run(|| use_relative_pointer(&node, Rc::new(timers.clone()), None));

        move_to(&element, 60.0, 40.0);
        owner.dispose();

        assert_eq!(element.listener_count(), 0);
        assert_eq!(timers.pending(), 0);
        timers.advance(FRAME);
        element.dispatch(PointerEvent::Enter);
        assert_eq!(pointer.get(), (0.0, 0.0, false));

        node.bind(Rc::new(element.clone()));
        assert_eq!(element.listener_count(), 0);
    }

    #[test]
    fn stop_detaches_before_owner_disposal() {
        let (timers, element, node) = setup();
        let owner = Owner::new();
        let pointer = owner.run(|| use_relative_pointer(&node, Rc::new(timers.clone()), None));

        move_to(&element, 60.0, 40.0);
        pointer.stop();

        assert_eq!(element.listener_count(), 0);
        assert_eq!(timers.pending(), 0);
        element.dispatch(PointerEvent::Enter);
        assert_eq!(pointer.get(), (0.0, 0.0, false));

        owner.dispose();
        assert_eq!(element.listener_count(), 0);
    }

    #[test]
    fn options_resolve_delay() {
        let (timers, element, node) = setup();
        let owner = Owner::new();
        let options = TrackerOptions::with_delay(Duration::from_millis(100));
        let pointer = owner.run(|| {
            use_relative_pointer_with_options(&node, Rc::new(timers.clone()), &options)
        });

        move_to(&element, 20.0, 30.0);
        timers.advance(Duration::from_millis(50));
        assert_eq!(pointer.x(), 0.0);
        timers.advance(Duration::from_millis(51));
        assert_eq!((pointer.x(), pointer.y()), (10.0, 10.0));
    }
}

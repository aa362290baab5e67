//! Demonstration of debounced pointer tracking on a synthetic element

use std::rc::Rc;
use std::time::Duration;
use tincan_hooks::host::{BoundingBox, ManualTimers, MemoryElement, PointerEvent, PointerMove};
use tincan_hooks::{use_relative_pointer, NodeRef, Owner};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    println!("=== Pointer Tracking Example ===\n");

    let timers = ManualTimers::new();
    let card = MemoryElement::new(BoundingBox::new(10.0, 20.0, 100.0, 50.0));
    let node = NodeRef::new();

    let owner = Owner::new();
    let pointer = owner.run(|| use_relative_pointer(&node, Rc::new(timers.clone()), None));
    let _watch = pointer
        .coords()
        .watch(|(x, y)| println!("   [Watch] pointer at ({x}, {y})"));

    println!("1. Binding the card element");
    node.bind(Rc::new(card.clone()));

    println!("\n2. Entering updates hover state immediately");
    card.dispatch(PointerEvent::Enter);
    println!("   within = {}", pointer.is_within());

    println!("\n3. A burst of moves settles into one update");
    for x in [30.0, 60.0, 90.0, 200.0] {
        card.dispatch(PointerEvent::Move(PointerMove::at(x, 30.0)));
        timers.advance(Duration::from_millis(4));
    }
    timers.advance(Duration::from_millis(17));
    println!("   sample = {:?}", pointer.get());

    println!("\n4. Leaving");
    card.dispatch(PointerEvent::Leave);
    println!("   within = {}", pointer.is_within());

    println!("\n5. Unmounting detaches every listener");
    owner.dispose();
    println!("   listeners = {}", card.listener_count());

    println!("\n✓ Example complete!");
}

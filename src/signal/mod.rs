//! Fine-grained reactive primitives.
//!
//! This module provides the core building blocks the hooks are built on:
//! - Signals: Reactive state containers
//! - Effects: Side effects that react to changes and clean up after themselves

mod effect;
mod signal;

pub use effect::{create_effect, Effect};
pub use signal::{create_signal, ReadSignal, Signal, WatchGuard, WriteSignal};

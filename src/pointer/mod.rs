//! Pointer tracking relative to an element.
//!
//! - [`relative_xy`]: the clamped coordinate computation
//! - [`Debouncer`]: trailing-edge coalescing on a [`TimerHost`](crate::host::TimerHost)
//! - [`use_relative_pointer`]: the hook tying both to a [`NodeRef`]

mod coords;
mod debounce;
mod tracker;

pub use coords::relative_xy;
pub use debounce::Debouncer;
pub use tracker::{use_relative_pointer, use_relative_pointer_with_options, NodeRef, RelativePointer};

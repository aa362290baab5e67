//! # Tincan Hooks
//!
//! Reactive UI hooks for Rust, built on a small fine-grained signal runtime.
//!
//! ## Hooks
//!
//! - [`use_local_storage`] - a value mirrored into durable storage and a
//!   cookie, kept in sync with changes made by other tabs
//! - [`use_relative_pointer`] - pointer coordinates relative to an element,
//!   clamped to its client box, with debounced moves and hover tracking
//!
//! ## Signals (Low-level primitives)
//!
//! - `Signal<T>` - Reactive values that notify dependents when changed
//! - `Effect` - Side effects that run when dependencies change
//! - `Owner` - A component lifetime; disposing it tears down every hook
//!   created inside it
//!
//! ## Hosts
//!
//! Hooks reach the environment only through the traits in [`host`]. The
//! in-memory hosts drive tests and native targets; the `web` feature adds
//! browser hosts built on `web-sys`.
//!
//! ```
//! use tincan_hooks::host::MemoryStorage;
//! use tincan_hooks::runtime::Owner;
//! use tincan_hooks::use_local_storage;
//! use std::rc::Rc;
//!
//! let storage = MemoryStorage::new();
//! let owner = Owner::new();
//! let count = owner.run(|| use_local_storage(Rc::new(storage.clone()), "count", 0_u32));
//!
//! count.set(1).unwrap();
//! storage.external_set("count", "5");
//! assert_eq!(count.get(), 5);
//!
//! owner.dispose();
//! assert_eq!(storage.listener_count(), 0);
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod pointer;
pub mod runtime;
pub mod signal;
pub mod storage;

// Re-export main types for convenience
pub use config::{HooksConfig, MirrorOptions, RenderMode, TrackerOptions};
pub use error::{MirrorError, MirrorResult, StorageError};
pub use pointer::{use_relative_pointer, NodeRef, RelativePointer};
pub use runtime::{on_cleanup, Owner};
pub use signal::{create_effect, create_signal, Effect, ReadSignal, Signal, WriteSignal};
pub use storage::{use_local_storage, PersistedValue};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let (signal, set_signal) = create_signal(0);
        assert_eq!(signal.get(), 0);
        set_signal.set(42);
        assert_eq!(signal.get(), 42);
    }
}

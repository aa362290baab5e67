//! Runtime support for reactive primitives.
//!
//! This module provides the infrastructure for dependency tracking,
//! component lifetimes ([`Owner`]) and scoped cleanup ([`on_cleanup`]).

mod context;
mod owner;

pub use context::{untrack, ReactiveRuntime};
pub use owner::{on_cleanup, Owner};

pub(crate) use context::RuntimeInner;
pub(crate) use owner::{with_cleanup_target, CleanupList};

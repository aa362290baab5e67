//! Values mirrored into durable storage.
//!
//! [`use_local_storage`] keeps a reactive value in step with a key in a
//! [`StorageHost`](crate::host::StorageHost) and with a cookie named
//! `ls-<key>`. Writes go through on every `set`; external changes
//! (another tab writing the same key) trigger a full re-read.
//!
//! Storage failures never escape as panics: the in-memory value stays
//! authoritative, the failure is logged with `tracing`, and the returned
//! [`MirrorResult`](crate::error::MirrorResult) lets callers decide whether
//! to care.

mod mirror;

pub use mirror::{use_local_storage, use_local_storage_with_options, PersistedValue};

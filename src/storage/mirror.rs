use crate::config::{MirrorOptions, RenderMode};
use crate::error::{MirrorError, MirrorResult};
use crate::host::StorageHost;
use crate::runtime::{on_cleanup, untrack};
use crate::signal::{create_effect, create_signal, Effect, ReadSignal, WriteSignal};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::rc::Rc;

struct MirrorState<T> {
    key: String,
    cookie_name: Option<String>,
    initial: T,
    host: Rc<dyn StorageHost>,
    render_mode: RenderMode,
    value: WriteSignal<T>,
}

impl<T> MirrorState<T>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
{
    fn set(&self, value: T) -> MirrorResult<()> {
        let raw = serde_json::to_string(&value);
        // In-memory state always takes the new value, even if persisting fails.
        self.value.set(value);

        if !self.render_mode.is_client() {
            return Ok(());
        }

        let result = self.persist(raw);
        if let Err(err) = &result {
            tracing::trace!(key = %self.key, error = %err, "failed to persist value");
        }
        result
    }

    fn persist(&self, raw: serde_json::Result<String>) -> MirrorResult<()> {
        let raw = raw.map_err(|source| MirrorError::Serialize {
            key: self.key.clone(),
            source,
        })?;

        self.host
            .set_item(&self.key, &raw)
            .map_err(|source| MirrorError::Write {
                key: self.key.clone(),
                source,
            })?;

        if let Some(name) = &self.cookie_name {
            self.host
                .set_cookie(name, &raw)
                .map_err(|source| MirrorError::Cookie {
                    name: name.clone(),
                    source,
                })?;
        }

        tracing::trace!(key = %self.key, bytes = raw.len(), "persisted value");
        Ok(())
    }

    fn read(&self) -> MirrorResult<Option<T>> {
        let raw = self
            .host
            .get_item(&self.key)
            .map_err(|source| MirrorError::Read {
                key: self.key.clone(),
                source,
            })?;

        match raw {
            // An empty string counts as absent.
            Some(raw) if !raw.is_empty() => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| MirrorError::Deserialize {
                    key: self.key.clone(),
                    source,
                }),
            _ => Ok(None),
        }
    }

    fn refresh(&self) -> MirrorResult<()> {
        if !self.render_mode.is_client() {
            return Ok(());
        }

        match self.read() {
            Ok(Some(value)) => self.set(value),
            Ok(None) => self.set(self.initial.clone()),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "falling back to initial value");
                // Any write failure here has already been logged by `set`.
                let _ = self.set(self.initial.clone());
                Err(err)
            }
        }
    }
}

/// A value mirrored into a [`StorageHost`].
///
/// Returned by [`use_local_storage`]. Clones share the same state.
pub struct PersistedValue<T> {
    state: Rc<MirrorState<T>>,
    value: ReadSignal<T>,
    effect: Option<Rc<Effect>>,
}

impl<T> Clone for PersistedValue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            value: self.value.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T> PersistedValue<T>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
{
    /// The current in-memory value, tracked.
    pub fn get(&self) -> T {
        self.value.get()
    }

    pub fn value(&self) -> ReadSignal<T> {
        self.value.clone()
    }

    /// Update the value and write it through to the store and cookie.
    ///
    /// The in-memory value is updated even when this returns an error.
    pub fn set(&self, value: T) -> MirrorResult<()> {
        self.state.set(value)
    }

    /// Compute a new value from the current one and [`set`](Self::set) it.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> MirrorResult<()> {
        let mut value = self.value.get_untracked();
        f(&mut value);
        self.set(value)
    }

    /// Re-read the store, falling back to the initial value when the stored
    /// text is missing or unreadable.
    pub fn refresh(&self) -> MirrorResult<()> {
        self.state.refresh()
    }

    pub fn key(&self) -> &str {
        &self.state.key
    }

    pub fn cookie_name(&self) -> Option<&str> {
        self.state.cookie_name.as_deref()
    }

    pub fn initial(&self) -> &T {
        &self.state.initial
    }

    /// Stop listening for external changes.
    pub fn stop(&self) {
        if let Some(effect) = &self.effect {
            effect.dispose();
        }
    }
}

/// Mirror a value into `host` under `key` with default options.
///
/// # Examples
///
/// ```
/// use tincan_hooks::host::MemoryStorage;
/// use tincan_hooks::runtime::Owner;
/// use tincan_hooks::storage::use_local_storage;
/// use std::rc::Rc;
///
/// let storage = MemoryStorage::new();
/// let owner = Owner::new();
/// let theme = owner.run(|| use_local_storage(Rc::new(storage.clone()), "theme", "light".to_string()));
///
/// theme.set("dark".to_string()).unwrap();
/// assert_eq!(theme.get(), "dark");
/// assert_eq!(storage.raw("theme").as_deref(), Some("\"dark\""));
/// assert_eq!(storage.cookie("ls-theme").as_deref(), Some("\"dark\""));
/// ```
pub fn use_local_storage<T>(
    host: Rc<dyn StorageHost>,
    key: impl Into<String>,
    initial: T,
) -> PersistedValue<T>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
{
    use_local_storage_with_options(host, key, initial, &MirrorOptions::default())
}

/// Mirror a value into `host` under `key`.
///
/// On the client this subscribes to external change notifications and
/// hydrates from any value already stored. Under [`RenderMode::Server`] the
/// host is never touched and `initial` is used as-is.
pub fn use_local_storage_with_options<T>(
    host: Rc<dyn StorageHost>,
    key: impl Into<String>,
    initial: T,
    options: &MirrorOptions,
) -> PersistedValue<T>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
{
    let key = key.into();
    let (value, set_value) = create_signal(initial.clone());
    let state = Rc::new(MirrorState {
        cookie_name: options.mirror_cookie.then(|| options.cookie_name(&key)),
        key,
        initial,
        host,
        render_mode: options.render_mode,
        value: set_value,
    });

    if !options.render_mode.is_client() {
        tracing::debug!(key = %state.key, "server render; storage untouched");
        return PersistedValue {
            state,
            value,
            effect: None,
        };
    }

    let effect = create_effect({
        let state = Rc::clone(&state);
        move || {
            let weak = Rc::downgrade(&state);
            let listener = state.host.subscribe_changes(Rc::new(move || {
                if let Some(state) = weak.upgrade() {
                    tracing::debug!(key = %state.key, "external storage change");
                    let _ = state.refresh();
                }
            }));

            tracing::debug!(key = %state.key, "hydrating from storage");
            let _ = untrack(|| state.refresh());

            let host = Rc::clone(&state.host);
            on_cleanup(move || host.unsubscribe_changes(listener));
        }
    });

    let effect = Rc::new(effect);
    on_cleanup({
        let effect = Rc::clone(&effect);
        move || effect.dispose()
    });

    PersistedValue {
        state,
        value,
        effect: Some(effect),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::host::MemoryStorage;
    use crate::runtime::Owner;

    fn mount<T>(storage: &MemoryStorage, key: &str, initial: T) -> (Owner, PersistedValue<T>)
    where
        T: Serialize + DeserializeOwned + Clone + 'static,
    {
        let owner = Owner::new();
        let value = owner.run(|| use_local_storage(Rc::new(storage.clone()), key, initial));
        (owner, value)
    }

    #[test]
    fn hydration_writes_initial_when_absent() {
        let storage = MemoryStorage::new();
        let (_owner, count) = mount(&storage, "count", 3_i32);

        assert_eq!(count.get(), 3);
        assert_eq!(storage.raw("count").as_deref(), Some("3"));
        assert_eq!(storage.cookie("ls-count").as_deref(), Some("3"));
    }

    #[test]
    fn hydration_reads_existing_value() {
        let storage = MemoryStorage::new();
        storage.insert_raw("names", r#"["a","b"]"#);
        let (_owner, names) = mount(&storage, "names", Vec::<String>::new());

        assert_eq!(names.get(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn malformed_json_falls_back_to_initial() {
        let storage = MemoryStorage::new();
        storage.insert_raw("count", "{not json");
        let (_owner, count) = mount(&storage, "count", 7_i32);

        assert_eq!(count.get(), 7);
        assert_eq!(storage.raw("count").as_deref(), Some("7"));
        assert!(count.refresh().is_ok());
    }

    #[test]
    fn empty_string_counts_as_absent() {
        let storage = MemoryStorage::new();
        storage.insert_raw("flag", "");
        let (_owner, flag) = mount(&storage, "flag", true);
        assert!(flag.get());
    }

    #[test]
    fn refresh_reports_parse_errors() {
        let storage = MemoryStorage::new();
        let (_owner, count) = mount(&storage, "count", 1_i32);
        storage.insert_raw("count", "oops");

        let err = count.refresh().unwrap_err();
        assert!(matches!(err, MirrorError::Deserialize { ref key, .. } if key == "count"));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn read_failure_falls_back_to_initial() {
        let storage = MemoryStorage::new();
        storage.insert_raw("count", "9");
        storage.fail_reads(Some(StorageError::Unavailable));
        let (_owner, count) = mount(&storage, "count", 2_i32);

        assert_eq!(count.get(), 2);
        assert!(matches!(count.refresh(), Err(MirrorError::Read { .. })));
    }

    #[test]
    fn write_failure_keeps_in_memory_value() {
        let storage = MemoryStorage::new();
        let (_owner, count) = mount(&storage, "count", 0_i32);
        storage.fail_writes(Some(StorageError::QuotaExceeded));

        let err = count.set(5).unwrap_err();
        assert!(matches!(
            err,
            MirrorError::Write {
                source: StorageError::QuotaExceeded,
                ..
            }
        ));
        assert_eq!(count.get(), 5);
        assert_eq!(storage.raw("count").as_deref(), Some("0"));
        assert_eq!(storage.cookie("ls-count").as_deref(), Some("0"));
    }

    #[test]
    fn cookie_failure_is_reported_after_store_write() {
        let storage = MemoryStorage::new();
        let (_owner, count) = mount(&storage, "count", 0_i32);
        storage.fail_cookie_writes(Some(StorageError::Backend("blocked".into())));

        assert!(matches!(count.set(4), Err(MirrorError::Cookie { ref name, .. }) if name == "ls-count"));
        assert_eq!(storage.raw("count").as_deref(), Some("4"));
    }

    #[test]
    fn serialization_failure_is_reported() {
        use std::collections::HashMap;

        let storage = MemoryStorage::new();
        let (_owner, map) = mount(&storage, "map", HashMap::<Vec<u8>, u8>::new());
        let mut bad = HashMap::new();
        bad.insert(vec![1_u8], 1_u8);

        assert!(matches!(map.set(bad.clone()), Err(MirrorError::Serialize { .. })));
        assert_eq!(map.get(), bad);
    }

    #[test]
    fn external_change_refreshes_value() {
        let storage = MemoryStorage::new();
        let (_owner, count) = mount(&storage, "count", 0_i32);

        storage.external_set("count", "42");
        assert_eq!(count.get(), 42);
        assert_eq!(storage.cookie("ls-count").as_deref(), Some("42"));

        storage.external_remove("count");
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn dispose_unsubscribes() {
        let storage = MemoryStorage::new();
        let (owner, count) = mount(&storage, "count", 0_i32);
        assert_eq!(storage.listener_count(), 1);

        owner.dispose();
        assert_eq!(storage.listener_count(), 0);
        storage.external_set("count", "8");
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn stop_detaches_change_listener() {
        let storage = MemoryStorage::new();
        let (_owner, count) = mount(&storage, "count", 0_i32);

        count.stop();
        assert_eq!(storage.listener_count(), 0);
        storage.external_set("count", "8");
        assert_eq!(count.get(), 0);

        count.set(2).unwrap();
        assert_eq!(storage.raw("count").as_deref(), Some("2"));
    }

    #[test]
    fn server_mode_never_touches_storage() {
        let storage = MemoryStorage::new();
        storage.insert_raw("count", "5");
        let owner = Owner::new();
        let count = owner.run(|| {
            use_local_storage_with_options(Rc::new(storage.clone()), "count", 1_i32, &MirrorOptions::server())
        });

        assert_eq!(count.get(), 1);
        count.set(2).unwrap();
        count.refresh().unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(storage.raw("count").as_deref(), Some("5"));
        assert_eq!(storage.write_count(), 0);
        assert_eq!(storage.listener_count(), 0);
    }

    #[test]
    fn cookie_mirroring_can_be_disabled() {
        let storage = MemoryStorage::new();
        let options = MirrorOptions {
            mirror_cookie: false,
            ..MirrorOptions::default()
        };
        let owner = Owner::new();
        let count = owner.run(|| {
            use_local_storage_with_options(Rc::new(storage.clone()), "count", 1_i32, &options)
        });

        count.set(3).unwrap();
        assert_eq!(count.cookie_name(), None);
        assert_eq!(storage.cookie("ls-count"), None);
        assert_eq!(storage.raw("count").as_deref(), Some("3"));
    }
}

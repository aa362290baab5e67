//! Options for the hooks, loadable from JSON.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pointer updates are coalesced to at most one per display frame at 60 Hz.
pub const DEFAULT_POINTER_DELAY: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Cookie name prefix used when mirroring a stored value.
pub const DEFAULT_COOKIE_PREFIX: &str = "ls-";

/// Where a hook is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderMode {
    /// Browser-side: storage and listeners are available.
    #[default]
    Client,
    /// Server-side rendering: storage must not be touched.
    Server,
}

impl RenderMode {
    pub fn is_client(self) -> bool {
        matches!(self, RenderMode::Client)
    }
}

/// Options for [`use_local_storage_with_options`](crate::storage::use_local_storage_with_options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MirrorOptions {
    pub cookie_prefix: String,
    pub mirror_cookie: bool,
    pub render_mode: RenderMode,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            cookie_prefix: DEFAULT_COOKIE_PREFIX.to_string(),
            mirror_cookie: true,
            render_mode: RenderMode::Client,
        }
    }
}

impl MirrorOptions {
    pub fn server() -> Self {
        Self {
            render_mode: RenderMode::Server,
            ..Self::default()
        }
    }

    pub fn cookie_name(&self, key: &str) -> String {
        format!("{}{}", self.cookie_prefix, key)
    }
}

/// Options for [`use_relative_pointer`](crate::pointer::use_relative_pointer).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerOptions {
    /// Debounce window in milliseconds. Zero is honoured; absent, negative
    /// or non-finite values fall back to [`DEFAULT_POINTER_DELAY`].
    pub delay_ms: Option<f64>,
}

impl TrackerOptions {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay_ms: Some(delay.as_secs_f64() * 1000.0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay_ms
            .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
            .unwrap_or(DEFAULT_POINTER_DELAY)
    }
}

/// Options for both hooks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    pub storage: MirrorOptions,
    pub pointer: TrackerOptions,
}

impl HooksConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

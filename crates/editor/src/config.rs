use std::str::FromStr;
use std::time::Duration;

/// Default quiet period before an autosave fires.
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 2000;

/// Default number of snapshots kept in the undo history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// How long the "saved" banner stays up before the status returns to idle.
pub const DEFAULT_SAVED_BANNER_MS: u64 = 2000;

/// How long the "error" banner stays up before the status returns to idle.
pub const DEFAULT_ERROR_BANNER_MS: u64 = 3000;

/// Editor session configuration loaded from environment variables.
///
/// All fields have defaults matching the admin editor's behaviour.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Whether edits schedule a debounced autosave (default: `true`).
    pub autosave_enabled: bool,
    /// Quiet period after the last edit before autosaving.
    pub autosave_debounce: Duration,
    /// Whether autosave applies the required-field policy like an explicit
    /// save does (default: `false`, partial drafts autosave).
    pub autosave_validates: bool,
    /// Maximum undo snapshots; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Delay before a `saved` status resets to `idle`.
    pub saved_banner: Duration,
    /// Delay before an `error` status resets to `idle`.
    pub error_banner: Duration,
    /// Save pending changes when the session is closed (default: `true`).
    pub flush_on_close: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_enabled: true,
            autosave_debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            autosave_validates: false,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
            saved_banner: Duration::from_millis(DEFAULT_SAVED_BANNER_MS),
            error_banner: Duration::from_millis(DEFAULT_ERROR_BANNER_MS),
            flush_on_close: true,
        }
    }
}

impl EditorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `EDITOR_AUTOSAVE_ENABLED`     | `true`  |
    /// | `EDITOR_AUTOSAVE_DEBOUNCE_MS` | `2000`  |
    /// | `EDITOR_AUTOSAVE_VALIDATES`   | `false` |
    /// | `EDITOR_HISTORY_LIMIT`        | `100` (`0` = unbounded) |
    /// | `EDITOR_SAVED_BANNER_MS`      | `2000`  |
    /// | `EDITOR_ERROR_BANNER_MS`      | `3000`  |
    /// | `EDITOR_FLUSH_ON_CLOSE`       | `true`  |
    pub fn from_env() -> Self {
        let history_limit = match env_or("EDITOR_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT) {
            0 => None,
            limit => Some(limit),
        };

        Self {
            autosave_enabled: env_or("EDITOR_AUTOSAVE_ENABLED", true),
            autosave_debounce: Duration::from_millis(env_or(
                "EDITOR_AUTOSAVE_DEBOUNCE_MS",
                DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            )),
            autosave_validates: env_or("EDITOR_AUTOSAVE_VALIDATES", false),
            history_limit,
            saved_banner: Duration::from_millis(env_or(
                "EDITOR_SAVED_BANNER_MS",
                DEFAULT_SAVED_BANNER_MS,
            )),
            error_banner: Duration::from_millis(env_or(
                "EDITOR_ERROR_BANNER_MS",
                DEFAULT_ERROR_BANNER_MS,
            )),
            flush_on_close: env_or("EDITOR_FLUSH_ON_CLOSE", true),
        }
    }
}

/// Read and parse `key`, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid config value, using default");
            default
        }),
        Err(_) => default,
    }
}

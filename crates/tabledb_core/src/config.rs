//! Table configuration.

use crate::error::{TableError, TableResult};
use std::time::Duration;

/// File locking behaviour on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Try to take the lock once; fail with `Locked` if it is held.
    NonBlocking,
    /// Do not lock the file at all.
    None,
}

/// Configuration for opening a table.
#[derive(Debug, Clone)]
pub struct Config {
    /// Create the table file if it does not exist.
    pub create_if_missing: bool,

    /// Open without write access. A missing file is `NotFound`.
    pub read_only: bool,

    /// Discard existing contents on open.
    pub truncate: bool,

    /// Sync the file on every commit point (safer but slower).
    pub sync_on_commit: bool,

    /// File locking behaviour.
    pub lock: LockMode,

    /// How long an operation waits for another thread's transaction.
    pub lock_timeout: Duration,

    /// Rewrite the log into a compact snapshot when the table is closed.
    pub compact_on_close: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            read_only: false,
            truncate: false,
            sync_on_commit: true,
            lock: LockMode::NonBlocking,
            lock_timeout: Duration::from_secs(5),
            compact_on_close: false,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a mode string made of single-letter flags.
    ///
    /// | letter | meaning |
    /// |---|---|
    /// | `r` | reader (read-only unless `w` is also given) |
    /// | `w` | writer |
    /// | `c` | create if missing |
    /// | `t` | truncate on open |
    /// | `e` | no file lock |
    /// | `f` | non-blocking file lock |
    ///
    /// The default table mode is `"wc"`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for unknown letters.
    pub fn from_mode(mode: &str) -> TableResult<Self> {
        let mut config = Self {
            create_if_missing: false,
            ..Self::default()
        };
        let mut reader = false;
        let mut writer = false;

        for flag in mode.chars() {
            match flag {
                'r' => reader = true,
                'w' => writer = true,
                'c' => config.create_if_missing = true,
                't' => config.truncate = true,
                'e' => config.lock = LockMode::None,
                'f' => config.lock = LockMode::NonBlocking,
                other => {
                    return Err(TableError::invalid_argument(format!(
                        "unknown mode flag {other:?} in {mode:?}"
                    )))
                }
            }
        }

        config.read_only = reader && !writer;
        if config.read_only {
            config.create_if_missing = false;
            config.truncate = false;
        }
        Ok(config)
    }

    /// Sets whether to create the table if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets read-only mode.
    #[must_use]
    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    /// Sets truncate-on-open.
    #[must_use]
    pub const fn truncate(mut self, value: bool) -> Self {
        self.truncate = value;
        self
    }

    /// Sets whether to sync on every commit point.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the file locking behaviour.
    #[must_use]
    pub const fn lock(mut self, mode: LockMode) -> Self {
        self.lock = mode;
        self
    }

    /// Sets how long to wait for another thread's transaction.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets whether to compact on close.
    #[must_use]
    pub const fn compact_on_close(mut self, value: bool) -> Self {
        self.compact_on_close = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(!config.read_only);
        assert!(config.sync_on_commit);
        assert_eq!(config.lock, LockMode::NonBlocking);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_on_commit(false)
            .lock_timeout(Duration::from_millis(10));

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_commit);
        assert_eq!(config.lock_timeout, Duration::from_millis(10));
    }

    #[test]
    fn mode_reader() {
        let config = Config::from_mode("r").unwrap();
        assert!(config.read_only);
        assert!(!config.create_if_missing);
    }

    #[test]
    fn mode_writer_create_truncate() {
        let config = Config::from_mode("wct").unwrap();
        assert!(!config.read_only);
        assert!(config.create_if_missing);
        assert!(config.truncate);
    }

    #[test]
    fn mode_reader_and_writer_is_writable() {
        let config = Config::from_mode("rw").unwrap();
        assert!(!config.read_only);
        assert!(!config.create_if_missing);
    }

    #[test]
    fn mode_no_lock() {
        assert_eq!(Config::from_mode("wce").unwrap().lock, LockMode::None);
    }

    #[test]
    fn mode_rejects_unknown_flag() {
        assert!(Config::from_mode("wx").is_err());
    }
}

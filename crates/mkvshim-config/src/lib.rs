//! # mkvshim-config
//!
//! Policy constants and runtime configuration for the mkvshim preload library.
//!
//! The managed-file policy (output directory, extension, forced mode) is fixed at
//! compile time. The only deployment-time knobs are read from the environment once,
//! when the shim attaches to its host process:
//!
//! - `MKVSHIM_NOTIFY`: `fifo` (default), `signal` or `none`
//! - `MKVSHIM_FIFO`: message channel endpoint (default: `/tmp/titles_done`)
//! - `MKVSHIM_SIGNAL_PID`: explicit target for the signal strategy
//! - `MKVSHIM_LOG`: tracing filter directive (default: `warn`)
//!
//! An invalid value only affects its own key; every other override still
//! applies. An unknown strategy leaves the default in place, and an invalid
//! signal target turns the signal strategy off rather than guessing one.

pub mod logging;
pub mod testing;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Directory the ripper writes titles into. Includes the trailing separator.
pub const OUTPUT_PREFIX: &str = "/output/";

/// Extension of managed output files, including the leading dot.
pub const MANAGED_EXTENSION: &str = ".mkv";

/// Length of the shortest managed path, `/output/title00.mkv`.
pub const MIN_MANAGED_LEN: usize = 19;

/// rw for owner, group and others.
pub const FORCED_MODE: u32 = 0o666;

/// Default message channel endpoint watched by the supervisor script.
pub const DEFAULT_FIFO_PATH: &str = "/tmp/titles_done";

/// Permissions of a freshly created endpoint.
pub const FIFO_MODE: u32 = 0o600;

/// Sentinel written when the shim attaches.
pub const SENTINEL_ATTACH: &str = "init";

/// Sentinel written when the shim detaches.
pub const SENTINEL_DETACH: &str = "fini";

pub const ENV_NOTIFY: &str = "MKVSHIM_NOTIFY";
pub const ENV_FIFO: &str = "MKVSHIM_FIFO";
pub const ENV_SIGNAL_PID: &str = "MKVSHIM_SIGNAL_PID";
pub const ENV_LOG: &str = "MKVSHIM_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown notification strategy {0:?} (expected fifo, signal or none)")]
    UnknownStrategy(String),
    #[error("invalid signal target pid {0:?}")]
    InvalidPid(String),
}

/// How completed titles are reported to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyStrategy {
    /// NUL-terminated paths written to a named pipe.
    #[default]
    Fifo,
    /// A bare signal to an ancestor process.
    Signal,
    /// Mode override only.
    None,
}

impl FromStr for NotifyStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "signal" => Ok(Self::Signal),
            "none" => Ok(Self::None),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for NotifyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fifo => "fifo",
            Self::Signal => "signal",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Runtime configuration of one shim instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub strategy: NotifyStrategy,
    pub fifo_path: PathBuf,
    /// Explicit target for [`NotifyStrategy::Signal`]; discovered when unset.
    pub signal_pid: Option<i32>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: NotifyStrategy::default(),
            fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
            signal_pid: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Never fails: the returned errors describe the values that were
    /// rejected, and the config holds everything else.
    pub fn load() -> (Self, Vec<ConfigError>) {
        let mut config = Config::default();
        let errors = config.apply_overrides(|key| std::env::var(key).ok());
        (config, errors)
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    ///
    /// Every valid key is applied; rejected ones are returned.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut errors = Vec::new();

        if let Some(strategy) = get(ENV_NOTIFY) {
            match strategy.parse() {
                Ok(strategy) => self.strategy = strategy,
                Err(e) => errors.push(e),
            }
        }
        if let Some(path) = get(ENV_FIFO) {
            self.fifo_path = PathBuf::from(path);
        }
        let mut bad_pid = false;
        if let Some(pid) = get(ENV_SIGNAL_PID) {
            match pid.trim().parse::<i32>().ok().filter(|p| *p > 0) {
                Some(parsed) => self.signal_pid = Some(parsed),
                None => {
                    bad_pid = true;
                    self.signal_pid = None;
                    errors.push(ConfigError::InvalidPid(pid));
                }
            }
        }
        // Never fall back to discovery when an explicit target was rejected.
        if bad_pid && self.strategy == NotifyStrategy::Signal {
            self.strategy = NotifyStrategy::None;
        }
        if let Some(filter) = get(ENV_LOG) {
            self.log_filter = filter;
        }
        errors
    }

    /// Environment variables that reproduce this configuration in a child
    /// process started with the shim preloaded.
    pub fn shim_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (ENV_NOTIFY.to_string(), self.strategy.to_string()),
            (
                ENV_FIFO.to_string(),
                self.fifo_path.to_string_lossy().into_owned(),
            ),
            (ENV_LOG.to_string(), self.log_filter.clone()),
        ];
        if let Some(pid) = self.signal_pid {
            env.push((ENV_SIGNAL_PID.to_string(), pid.to_string()));
        }
        env
    }
}

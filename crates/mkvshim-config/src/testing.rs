//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - An isolated stand-in for the output directory
//! - A unique message channel endpoint path
//!
//! # Usage
//!
//! ```ignore
//! use mkvshim_config::testing::TestEnvironment;
//!
//! #[test]
//! fn test_something() {
//!     let env = TestEnvironment::new().unwrap();
//!     // env.output_dir and env.fifo_path are unique to this test
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

use crate::{Config, NotifyStrategy};

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with unique paths
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Directory playing the role of `/output/`
    pub output_dir: PathBuf,
    /// Endpoint path for the message channel; not created
    pub fifo_path: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let output_dir = root.join("output");
        std::fs::create_dir_all(&output_dir)?;

        let fifo_path = root.join(format!("titles_done-{}", test_id));

        Ok(Self {
            _temp_dir: temp_dir,
            output_dir,
            fifo_path,
            test_id,
        })
    }

    /// Output directory as a classifier prefix, with trailing separator.
    pub fn output_prefix(&self) -> String {
        format!("{}/", self.output_dir.display())
    }

    /// Absolute path of `name` inside the output directory (not created).
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Create a file inside the output directory with content
    pub fn create_output(&self, name: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.output_path(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Config pointing the message channel at this environment's endpoint.
    pub fn config(&self) -> Config {
        Config {
            strategy: NotifyStrategy::Fifo,
            fifo_path: self.fifo_path.clone(),
            ..Config::default()
        }
    }

    /// Environment variables for spawning a host process with the shim preloaded.
    pub fn shim_env(&self) -> Vec<(String, String)> {
        self.config().shim_env()
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_output_dir() {
        let env = TestEnvironment::new().unwrap();
        assert!(env.output_dir.is_dir());
        assert!(!env.fifo_path.exists());
        assert!(env.output_prefix().ends_with("/output/"));
    }

    #[test]
    fn test_environment_has_unique_endpoint() {
        let env1 = TestEnvironment::new().unwrap();
        let env2 = TestEnvironment::new().unwrap();
        assert_ne!(env1.fifo_path, env2.fifo_path);
        assert_ne!(env1.test_id, env2.test_id);
    }

    #[test]
    fn test_create_output() {
        let env = TestEnvironment::new().unwrap();
        let path = env.create_output("title00.mkv", b"matroska").unwrap();
        assert!(path.starts_with(&env.output_dir));
        assert_eq!(std::fs::read(&path).unwrap(), b"matroska");
    }

    #[test]
    fn test_shim_env() {
        let env = TestEnvironment::new().unwrap();
        let vars = env.shim_env();
        assert!(vars.iter().any(|(k, v)| k == "MKVSHIM_NOTIFY" && v == "fifo"));
        assert!(vars
            .iter()
            .any(|(k, v)| k == "MKVSHIM_FIFO" && v.ends_with(&format!("titles_done-{}", env.test_id))));
    }
}

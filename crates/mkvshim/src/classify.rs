//! Managed-path policy.
//!
//! Pure string predicate; never touches the filesystem.

use std::borrow::Cow;

use mkvshim_config::{MANAGED_EXTENSION, MIN_MANAGED_LEN, OUTPUT_PREFIX};

/// Shortest title stem the ripper produces (`title00`).
const MIN_STEM_LEN: usize = 7;

/// Which paths count as managed output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy {
    prefix: Cow<'static, str>,
    extension: Cow<'static, str>,
    min_len: usize,
}

impl ManagedPolicy {
    /// `/output/*.mkv`, at least 19 bytes.
    pub const DEFAULT: ManagedPolicy = ManagedPolicy {
        prefix: Cow::Borrowed(OUTPUT_PREFIX),
        extension: Cow::Borrowed(MANAGED_EXTENSION),
        min_len: MIN_MANAGED_LEN,
    };

    /// Policy for another directory. `prefix` must end with the separator and
    /// `extension` must include the dot.
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let extension = extension.into();
        let min_len = prefix.len() + MIN_STEM_LEN + extension.len();
        Self {
            prefix: Cow::Owned(prefix),
            extension: Cow::Owned(extension),
            min_len,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Bytewise check, so non-UTF-8 paths are handled too.
    #[inline]
    pub fn matches(&self, path: &[u8]) -> bool {
        if path.len() < self.min_len {
            return false;
        }
        if !path.starts_with(self.prefix.as_bytes()) {
            return false;
        }
        // Suffix from the last '.', wherever it sits.
        match path.iter().rposition(|&b| b == b'.') {
            Some(dot) => &path[dot..] == self.extension.as_bytes(),
            None => false,
        }
    }

    #[inline]
    pub fn is_managed(&self, path: &str) -> bool {
        self.matches(path.as_bytes())
    }
}

impl Default for ManagedPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Whether `path` is a managed output file under the fixed policy.
#[inline]
pub fn is_managed(path: &str) -> bool {
    ManagedPolicy::DEFAULT.is_managed(path)
}

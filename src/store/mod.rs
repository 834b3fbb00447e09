//! Object store accessors.
//!
//! The dashboard only ever needs two things from storage: a sorted listing of
//! keys under a prefix, and the raw bytes behind a key. [`ObjectStore`] is that
//! seam. [`S3Store`] talks to S3-compatible REST endpoints; [`LocalStore`]
//! serves a directory tree for offline use and tests.

pub mod local;
pub mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

use crate::config;
use crate::error::Result;

/// Read-only access to a bucket-like key space.
pub trait ObjectStore: Send {
    /// List keys starting with `prefix` that pass `filter`, sorted ascending.
    fn list(&self, prefix: &str, filter: &KeyFilter) -> Result<Vec<String>>;

    /// Fetch the full contents of `key`.
    ///
    /// A key that does not exist yields [`DashboardError::NotFound`](crate::DashboardError::NotFound).
    fn fetch(&self, key: &str) -> Result<Vec<u8>>;

    /// Short human-readable location, used in logs and `Display`.
    fn location(&self) -> String;
}

/// Suffix and substring constraints applied to listed keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    pub suffix: Option<String>,
    pub contains: Option<String>,
}

impl KeyFilter {
    /// Accept every key.
    pub fn any() -> Self {
        Self::default()
    }

    /// Daily result files: `*.csv` containing `aggregated_results`.
    pub fn result_files() -> Self {
        Self {
            suffix: Some(config::RESULT_FILE_SUFFIX.to_string()),
            contains: Some(config::RESULT_FILE_MARKER.to_string()),
        }
    }

    /// Chart images: `*.png`.
    pub fn plot_images() -> Self {
        Self {
            suffix: Some(config::PLOT_FILE_SUFFIX.to_string()),
            contains: None,
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        let suffix_ok = self
            .suffix
            .as_deref()
            .map(|s| key.ends_with(s))
            .unwrap_or(true);
        let contains_ok = self
            .contains
            .as_deref()
            .map(|s| key.contains(s))
            .unwrap_or(true);
        suffix_ok && contains_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_filter_needs_marker_and_suffix() {
        let f = KeyFilter::result_files();
        assert!(f.matches("combined/aggregated_results_20250101.csv"));
        assert!(!f.matches("combined/aggregated_results_20250101.csv.bak"));
        assert!(!f.matches("combined/summary_20250101.csv"));
    }

    #[test]
    fn any_filter_accepts_everything() {
        assert!(KeyFilter::any().matches(""));
        assert!(KeyFilter::any().matches("a/b/c.txt"));
    }
}

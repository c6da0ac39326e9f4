//! Sub-repository permission checks forwarded through a request.

use crate::{CodenavError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Decides whether the caller may see a path inside a repository.
pub trait SubRepoPermissionChecker: Send + Sync {
    /// Whether path-level permissions apply at all.
    fn enabled(&self) -> bool;

    fn can_read(&self, repository_name: &str, path: &str) -> bool;
}

/// Checker used when sub-repo permissions are off: everything is readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPermissionChecker;

impl SubRepoPermissionChecker for NoopPermissionChecker {
    fn enabled(&self) -> bool {
        false
    }

    fn can_read(&self, _repository_name: &str, _path: &str) -> bool {
        true
    }
}

/// Denies paths matching any of a set of glob patterns.
pub struct GlobPermissionChecker {
    denied: GlobSet,
    pattern_count: usize,
}

impl GlobPermissionChecker {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern.as_ref())
                .map_err(|e| CodenavError::Configuration(format!("invalid deny glob: {e}")))?;
            builder.add(glob);
        }
        let denied = builder
            .build()
            .map_err(|e| CodenavError::Configuration(format!("invalid deny globs: {e}")))?;
        Ok(Self {
            denied,
            pattern_count: patterns.len(),
        })
    }
}

impl SubRepoPermissionChecker for GlobPermissionChecker {
    fn enabled(&self) -> bool {
        self.pattern_count > 0
    }

    fn can_read(&self, _repository_name: &str, path: &str) -> bool {
        !self.denied.is_match(path)
    }
}

//! Codenav Core - Per-request state for code navigation
//!
//! This library holds the caches a single navigation request builds once and
//! reads many times: the visible uploads, diff hunks used to translate
//! positions between commits, and commit existence/ancestry answers.

pub mod authz;
pub mod commit_cache;
pub mod config;
pub mod error;
pub mod git;
pub mod hunk_cache;
pub mod request_state;
pub mod translator;
pub mod upload;
pub mod upload_cache;

pub use authz::{GlobPermissionChecker, NoopPermissionChecker, SubRepoPermissionChecker};
pub use commit_cache::CommitCache;
pub use config::{Config, RequestConfig};
pub use error::CodenavError;
pub use git::{CommitClient, GitClient, GitCommandClient, Repo, RepositoryCommit};
pub use hunk_cache::{Hunk, HunkCache};
pub use request_state::{RequestArgs, RequestState};
pub use translator::{GitTreeTranslator, Position, Range};
pub use upload::{StoredUpload, Upload};
pub use upload_cache::UploadCache;

/// Result type alias for codenav operations
pub type Result<T> = std::result::Result<T, CodenavError>;

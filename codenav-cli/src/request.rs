//! Build the request state a CLI invocation answers from.

use codenav_core::git::head_commit_sha;
use codenav_core::{
    CodenavError, Config, GitCommandClient, GlobPermissionChecker, NoopPermissionChecker, Repo,
    RequestArgs, RequestState, StoredUpload, SubRepoPermissionChecker,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the request points and how it is bounded
pub struct RequestOptions {
    pub root: PathBuf,
    pub uploads: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub repo_id: i32,
    pub repo_name: Option<String>,
    pub commit: Option<String>,
    pub path: String,
    pub max_indexes: Option<usize>,
    pub hunk_cache_size: Option<usize>,
}

/// Load the upload list the store would have returned.
pub fn load_uploads(path: &Path) -> codenav_core::Result<Vec<StoredUpload>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Resolve config, flags and git state into a [`RequestState`].
///
/// Flags override the config file, which overrides built-in defaults.
pub fn build(options: RequestOptions) -> codenav_core::Result<RequestState> {
    let config = match &options.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let mut request_config = config.request.clone();
    if let Some(max_indexes) = options.max_indexes {
        request_config.maximum_indexes_per_moniker_search = max_indexes;
    }
    if let Some(size) = options.hunk_cache_size {
        request_config.hunk_cache_size = size;
    }

    let uploads = match &options.uploads {
        Some(path) => load_uploads(path)?,
        None => Vec::new(),
    };

    let commit = match options.commit {
        Some(commit) => commit,
        None => head_commit_sha(&options.root).ok_or_else(|| CodenavError::Git {
            command: "rev-parse HEAD".to_string(),
            message: format!("no HEAD commit in {}", options.root.display()),
        })?,
    };

    let repo = Repo {
        id: options.repo_id,
        name: options
            .repo_name
            .unwrap_or_else(|| repo_name_from_root(&options.root)),
    };

    let auth_checker: Arc<dyn SubRepoPermissionChecker> = if config.authz.deny.is_empty() {
        Arc::new(NoopPermissionChecker)
    } else {
        Arc::new(GlobPermissionChecker::new(config.authz.deny.as_slice())?)
    };

    let client = Arc::new(GitCommandClient::new());
    client.register(&repo, &options.root);

    tracing::info!(repo = %repo.name, %commit, path = %options.path, "building request state");

    RequestState::new(
        uploads,
        auth_checker,
        client.clone(),
        RequestArgs {
            repo,
            commit,
            path: options.path,
        },
        client,
        &request_config,
    )
}

fn repo_name_from_root(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "repo".to_string())
}

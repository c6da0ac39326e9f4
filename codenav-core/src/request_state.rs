//! Per-request state shared by every lookup serving one navigation request.

use crate::{
    CommitCache, CommitClient, GitClient, GitTreeTranslator, HunkCache, Repo, RequestConfig,
    Result, StoredUpload, SubRepoPermissionChecker, Upload, UploadCache,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The repository, commit and path a request was made at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestArgs {
    pub repo: Repo,
    pub commit: String,
    pub path: String,
}

/// Caches built once at the start of a request and read for its lifetime.
///
/// Safe to share by reference across the threads serving one request. Never
/// shared between requests.
pub struct RequestState {
    uploads: UploadCache,
    git_tree_translator: GitTreeTranslator,
    commit_cache: CommitCache,
    auth_checker: Arc<dyn SubRepoPermissionChecker>,
    maximum_indexes_per_moniker_search: usize,
}

impl RequestState {
    /// Build the state for one request.
    ///
    /// Fails with [`CodenavError::Configuration`](crate::CodenavError::Configuration)
    /// when a bound in `config` is not positive.
    pub fn new(
        uploads: Vec<StoredUpload>,
        auth_checker: Arc<dyn SubRepoPermissionChecker>,
        git_client: Arc<dyn GitClient>,
        args: RequestArgs,
        commit_client: Arc<dyn CommitClient>,
        config: &RequestConfig,
    ) -> Result<Self> {
        config.validate()?;
        let hunk_cache = HunkCache::new(config.hunk_cache_size)?;

        let upload_cache = UploadCache::new();
        let count = uploads.len();
        for upload in uploads {
            upload_cache.insert(Upload::from(upload));
        }

        tracing::debug!(
            repo = %args.repo.name,
            commit = %args.commit,
            path = %args.path,
            uploads = count,
            "request state built"
        );

        Ok(Self {
            uploads: upload_cache,
            git_tree_translator: GitTreeTranslator::new(git_client, args, hunk_cache),
            commit_cache: CommitCache::new(commit_client),
            auth_checker,
            maximum_indexes_per_moniker_search: config.maximum_indexes_per_moniker_search,
        })
    }

    pub fn get_cache_uploads(&self) -> Arc<Vec<Upload>> {
        self.uploads.all()
    }

    pub fn get_cache_uploads_at_index(&self, index: usize) -> Option<Upload> {
        self.uploads.at(index)
    }

    pub fn get_upload_from_cache_map(&self, id: i32) -> Option<Upload> {
        self.uploads.lookup(id)
    }

    /// Overwrite cached uploads by id once a refined set is known.
    pub fn set_uploads_in_cache_map(&self, uploads: &[Upload]) {
        self.uploads.refresh(uploads);
    }

    pub fn uploads(&self) -> &UploadCache {
        &self.uploads
    }

    pub fn args(&self) -> &RequestArgs {
        self.git_tree_translator.args()
    }

    pub fn git_tree_translator(&self) -> &GitTreeTranslator {
        &self.git_tree_translator
    }

    pub fn commit_cache(&self) -> &CommitCache {
        &self.commit_cache
    }

    pub fn auth_checker(&self) -> &Arc<dyn SubRepoPermissionChecker> {
        &self.auth_checker
    }

    pub fn maximum_indexes_per_moniker_search(&self) -> usize {
        self.maximum_indexes_per_moniker_search
    }

    /// Split upload ids into moniker search batches.
    ///
    /// Ids not in the cache, or whose root the caller cannot read, are
    /// dropped. Order and duplicates of `ids` are otherwise kept.
    pub fn moniker_search_batches(&self, ids: &[i32]) -> Vec<Vec<i32>> {
        let visible: Vec<i32> = ids
            .iter()
            .copied()
            .filter(|&id| {
                self.uploads.lookup(id).is_some_and(|upload| {
                    self.auth_checker.can_read(
                        &upload.repository_name,
                        upload.root.trim_end_matches('/'),
                    )
                })
            })
            .collect();

        visible
            .chunks(self.maximum_indexes_per_moniker_search)
            .map(<[i32]>::to_vec)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CodenavError, GlobPermissionChecker, NoopPermissionChecker, RepositoryCommit};
    use time::macros::datetime;

    struct NoGit;

    impl GitClient for NoGit {
        fn diff_path(
            &self,
            _repo: &Repo,
            _source: &str,
            _target: &str,
            _path: &str,
        ) -> Result<String> {
            Ok(String::new())
        }
    }

    impl CommitClient for NoGit {
        fn commits_exist(&self, commits: &[RepositoryCommit]) -> Result<Vec<bool>> {
            Ok(vec![true; commits.len()])
        }

        fn is_ancestor(
            &self,
            _repository_id: i32,
            _ancestor: &str,
            _descendant: &str,
        ) -> Result<bool> {
            Ok(true)
        }
    }

    fn stored(id: i32, root: &str, indexer: &str) -> StoredUpload {
        StoredUpload {
            id,
            commit: format!("commit-{id}"),
            root: root.to_string(),
            visible_at_tip: true,
            uploaded_at: datetime!(2024-05-01 09:30 UTC),
            state: "completed".to_string(),
            failure_message: None,
            started_at: None,
            finished_at: None,
            process_after: None,
            num_resets: 0,
            num_failures: 0,
            repository_id: 1,
            repository_name: "github.com/acme/widgets".to_string(),
            indexer: indexer.to_string(),
            indexer_version: "1.0".to_string(),
            associated_index_id: None,
        }
    }

    fn args() -> RequestArgs {
        RequestArgs {
            repo: Repo {
                id: 1,
                name: "github.com/acme/widgets".to_string(),
            },
            commit: "head".to_string(),
            path: "src/lib.rs".to_string(),
        }
    }

    fn build(
        uploads: Vec<StoredUpload>,
        checker: Arc<dyn SubRepoPermissionChecker>,
        config: RequestConfig,
    ) -> Result<RequestState> {
        let git = Arc::new(NoGit);
        RequestState::new(uploads, checker, git.clone(), args(), git, &config)
    }

    fn config(maximum_indexes_per_moniker_search: usize, hunk_cache_size: usize) -> RequestConfig {
        RequestConfig {
            maximum_indexes_per_moniker_search,
            hunk_cache_size,
        }
    }

    #[test]
    fn test_lookups_after_construction() {
        let state = build(
            vec![stored(1, "", "scip-go"), stored(2, "", "scip-rust")],
            Arc::new(NoopPermissionChecker),
            config(50, 100),
        )
        .unwrap();

        let all = state.get_cache_uploads();
        assert_eq!(all.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(state.get_cache_uploads_at_index(0).unwrap().id, 1);
        assert!(state.get_cache_uploads_at_index(5).is_none());
        assert_eq!(state.get_upload_from_cache_map(2).unwrap().indexer, "scip-rust");
        assert!(state.get_upload_from_cache_map(99).is_none());
        assert_eq!(state.maximum_indexes_per_moniker_search(), 50);
        assert_eq!(state.git_tree_translator().hunk_cache().capacity(), 100);
        assert_eq!(state.args().path, "src/lib.rs");
    }

    #[test]
    fn test_zero_hunk_cache_size_fails() {
        let err = build(Vec::new(), Arc::new(NoopPermissionChecker), config(50, 0))
            .err()
            .unwrap();
        assert!(matches!(err, CodenavError::Configuration(_)));
    }

    #[test]
    fn test_zero_moniker_batch_fails() {
        let err = build(Vec::new(), Arc::new(NoopPermissionChecker), config(0, 10))
            .err()
            .unwrap();
        assert!(matches!(err, CodenavError::Configuration(_)));
    }

    #[test]
    fn test_refresh_through_state() {
        let state = build(
            vec![stored(1, "", "scip-go")],
            Arc::new(NoopPermissionChecker),
            config(50, 100),
        )
        .unwrap();

        let mut refined = state.get_upload_from_cache_map(1).unwrap();
        refined.visible_at_tip = false;
        state.set_uploads_in_cache_map(&[refined]);

        assert!(!state.get_upload_from_cache_map(1).unwrap().visible_at_tip);
        assert!(state.get_cache_uploads()[0].visible_at_tip);
        assert_eq!(state.uploads().len(), 1);
    }

    #[test]
    fn test_moniker_batches_respect_bound_and_permissions() {
        let uploads = (1..=5)
            .map(|id| stored(id, if id == 3 { "secret/keys/" } else { "" }, "scip-go"))
            .collect();
        let checker = GlobPermissionChecker::new(&["secret/**"]).unwrap();
        let state = build(uploads, Arc::new(checker), config(2, 10)).unwrap();

        let batches = state.moniker_search_batches(&[1, 2, 3, 4, 5, 42]);
        assert_eq!(batches, vec![vec![1, 2], vec![4, 5]]);
        assert!(state.moniker_search_batches(&[]).is_empty());
    }

    #[test]
    fn test_state_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RequestState>();
    }
}

//! Commit cache: memoized commit existence and ancestry answers.

use crate::{CodenavError, CommitClient, RepositoryCommit, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type AncestryKey = (i32, String, String);

/// Remembers what the [`CommitClient`] said for the rest of the request.
///
/// Only positive and negative answers are stored; client errors are returned
/// to the caller and the next call asks again.
pub struct CommitCache {
    client: Arc<dyn CommitClient>,
    /// repository id -> commit -> exists
    resolvable: RwLock<HashMap<i32, HashMap<String, bool>>>,
    ancestry: RwLock<HashMap<AncestryKey, bool>>,
}

impl CommitCache {
    pub fn new(client: Arc<dyn CommitClient>) -> Self {
        Self {
            client,
            resolvable: RwLock::new(HashMap::new()),
            ancestry: RwLock::new(HashMap::new()),
        }
    }

    /// Whether each commit exists in its repository, in input order.
    ///
    /// Commits not seen before are resolved with a single client call.
    pub fn exists_batch(&self, commits: &[RepositoryCommit]) -> Result<Vec<bool>> {
        let mut answers: Vec<Option<bool>> = {
            let resolvable = self.resolvable.read();
            commits
                .iter()
                .map(|rc| {
                    resolvable
                        .get(&rc.repository_id)
                        .and_then(|by_commit| by_commit.get(&rc.commit))
                        .copied()
                })
                .collect()
        };

        let misses: Vec<usize> = answers
            .iter()
            .enumerate()
            .filter_map(|(i, answer)| answer.is_none().then_some(i))
            .collect();

        if !misses.is_empty() {
            let pending: Vec<RepositoryCommit> =
                misses.iter().map(|&i| commits[i].clone()).collect();
            tracing::debug!(misses = pending.len(), "commit cache miss");
            let exists = self.client.commits_exist(&pending)?;
            if exists.len() != pending.len() {
                return Err(CodenavError::Git {
                    command: "commits_exist".to_string(),
                    message: format!(
                        "expected {} answers, got {}",
                        pending.len(),
                        exists.len()
                    ),
                });
            }

            let mut resolvable = self.resolvable.write();
            for (&i, exists) in misses.iter().zip(exists) {
                let rc = &commits[i];
                resolvable
                    .entry(rc.repository_id)
                    .or_default()
                    .insert(rc.commit.clone(), exists);
                answers[i] = Some(exists);
            }
        }

        // every miss was answered above
        Ok(answers.into_iter().flatten().collect())
    }

    /// Same as [`exists_batch`](Self::exists_batch); commits that exist can be
    /// resolved by the navigation pipeline.
    pub fn are_commits_resolvable(&self, commits: &[RepositoryCommit]) -> Result<Vec<bool>> {
        self.exists_batch(commits)
    }

    /// Record a commit already known to exist (e.g. one an upload was built at).
    pub fn set_resolvable_commit(&self, repository_id: i32, commit: &str) {
        self.resolvable
            .write()
            .entry(repository_id)
            .or_default()
            .insert(commit.to_string(), true);
    }

    pub fn is_ancestor(
        &self,
        repository_id: i32,
        ancestor: &str,
        descendant: &str,
    ) -> Result<bool> {
        let key = (repository_id, ancestor.to_string(), descendant.to_string());
        if let Some(&answer) = self.ancestry.read().get(&key) {
            return Ok(answer);
        }

        tracing::debug!(repository_id, ancestor, descendant, "ancestry cache miss");
        let answer = self.client.is_ancestor(repository_id, ancestor, descendant)?;
        self.ancestry.write().insert(key, answer);
        Ok(answer)
    }
}

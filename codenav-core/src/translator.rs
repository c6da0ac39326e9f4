//! Translate positions in a file between two commits using diff hunks.

use crate::hunk_cache::{parse_hunks, Hunk, HunkCache, HunkKey};
use crate::request_state::RequestArgs;
use crate::{GitClient, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Zero-indexed line and character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Translates positions between an arbitrary commit and the commit the
/// request was made at.
///
/// Diffs are fetched through the [`GitClient`] the first time a
/// (commit, path) pair is seen and retained in the request's [`HunkCache`].
pub struct GitTreeTranslator {
    client: Arc<dyn GitClient>,
    args: RequestArgs,
    hunk_cache: HunkCache,
}

impl GitTreeTranslator {
    pub fn new(client: Arc<dyn GitClient>, args: RequestArgs, hunk_cache: HunkCache) -> Self {
        Self {
            client,
            args,
            hunk_cache,
        }
    }

    pub fn args(&self) -> &RequestArgs {
        &self.args
    }

    pub fn hunk_cache(&self) -> &HunkCache {
        &self.hunk_cache
    }

    /// Translate `position` in the request path from `commit` to the request
    /// commit, or back when `reverse` is set.
    ///
    /// Returns `None` when the line was touched by a change between the two
    /// commits.
    pub fn get_target_commit_position_from_source_position(
        &self,
        commit: &str,
        position: Position,
        reverse: bool,
    ) -> Result<Option<Position>> {
        if commit == self.args.commit {
            return Ok(Some(position));
        }
        let hunks = self.read_cached_hunks(commit, &self.args.path)?;
        Ok(adjust_position(&hunks, position, reverse))
    }

    /// Translate both ends of `range` in `path`. Fails soft if either end
    /// cannot be mapped.
    pub fn get_target_commit_range_from_source_range(
        &self,
        commit: &str,
        path: &str,
        range: Range,
        reverse: bool,
    ) -> Result<Option<Range>> {
        if commit == self.args.commit {
            return Ok(Some(range));
        }
        let hunks = self.read_cached_hunks(commit, path)?;
        let start = adjust_position(&hunks, range.start, reverse);
        let end = adjust_position(&hunks, range.end, reverse);
        Ok(start.zip(end).map(|(start, end)| Range { start, end }))
    }

    /// Hunks of `path` from `commit` to the request commit. The diff is
    /// always stored in the forward direction so both directions share one
    /// cache entry.
    fn read_cached_hunks(&self, commit: &str, path: &str) -> Result<Arc<Vec<Hunk>>> {
        let key = HunkKey {
            source: commit.to_string(),
            target: self.args.commit.clone(),
            path: path.to_string(),
        };
        if let Some(hunks) = self.hunk_cache.get(&key) {
            return Ok(hunks);
        }

        tracing::debug!(
            repo = %self.args.repo.name,
            source = %commit,
            target = %self.args.commit,
            path,
            "hunk cache miss"
        );
        let diff = self
            .client
            .diff_path(&self.args.repo, commit, &self.args.commit, path)?;
        let hunks = Arc::new(parse_hunks(&diff)?);
        self.hunk_cache.insert(key, Arc::clone(&hunks));
        Ok(hunks)
    }
}

/// Map a zero-indexed position through `hunks`.
pub(crate) fn adjust_position(
    hunks: &[Hunk],
    position: Position,
    reverse: bool,
) -> Option<Position> {
    let line = u64::from(position.line) + 1;
    let mut adjusted = line as i64;

    for hunk in hunks {
        let hunk = if reverse { hunk.reversed() } else { *hunk };
        let first_affected = if hunk.orig_lines == 0 {
            hunk.orig_end()
        } else {
            hunk.orig_start_line
        };
        if line < u64::from(first_affected) {
            break;
        }
        if hunk.orig_lines > 0 && line < u64::from(hunk.orig_end()) {
            return None;
        }
        adjusted = line as i64 + i64::from(hunk.new_end()) - i64::from(hunk.orig_end());
    }

    let line = u32::try_from(adjusted - 1).ok()?;
    Some(Position::new(line, position.character))
}

//! Bounded cache of parsed diff hunks, keyed by (source, target, path).

use crate::{CodenavError, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// One `@@ -a,b +c,d @@` header of a zero-context unified diff.
///
/// Line numbers are 1-indexed. A zero-length side names the line the change
/// sits after, as git prints it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk {
    pub orig_start_line: u32,
    pub orig_lines: u32,
    pub new_start_line: u32,
    pub new_lines: u32,
}

impl Hunk {
    pub fn new(orig_start_line: u32, orig_lines: u32, new_start_line: u32, new_lines: u32) -> Self {
        Self {
            orig_start_line,
            orig_lines,
            new_start_line,
            new_lines,
        }
    }

    /// First original line after the hunk.
    pub(crate) fn orig_end(&self) -> u32 {
        side_end(self.orig_start_line, self.orig_lines)
    }

    /// First new line after the hunk.
    pub(crate) fn new_end(&self) -> u32 {
        side_end(self.new_start_line, self.new_lines)
    }

    /// Same hunk seen from the target side.
    pub(crate) fn reversed(&self) -> Hunk {
        Hunk {
            orig_start_line: self.new_start_line,
            orig_lines: self.new_lines,
            new_start_line: self.orig_start_line,
            new_lines: self.orig_lines,
        }
    }
}

fn side_end(start: u32, lines: u32) -> u32 {
    if lines == 0 {
        start + 1
    } else {
        start + lines
    }
}

/// Parse hunk headers out of `git diff -U0` output. Body lines are ignored.
pub fn parse_hunks(diff: &str) -> Result<Vec<Hunk>> {
    let mut hunks = Vec::new();
    for line in diff.lines() {
        let Some(rest) = line.strip_prefix("@@ ") else {
            continue;
        };
        let Some((ranges, _)) = rest.split_once(" @@") else {
            return Err(CodenavError::DiffParse(format!("unterminated hunk header: {line}")));
        };
        let mut parts = ranges.split_whitespace();
        let (Some(orig), Some(new), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CodenavError::DiffParse(format!("malformed hunk header: {line}")));
        };
        let (orig_start_line, orig_lines) = parse_range(orig, '-', line)?;
        let (new_start_line, new_lines) = parse_range(new, '+', line)?;
        hunks.push(Hunk::new(orig_start_line, orig_lines, new_start_line, new_lines));
    }
    Ok(hunks)
}

fn parse_range(range: &str, sigil: char, header: &str) -> Result<(u32, u32)> {
    let malformed = || CodenavError::DiffParse(format!("malformed hunk range in: {header}"));
    let range = range.strip_prefix(sigil).ok_or_else(malformed)?;
    let (start, len) = match range.split_once(',') {
        Some((start, len)) => (start, len),
        None => (range, "1"),
    };
    let start: u32 = start.parse().map_err(|_| malformed())?;
    let len: u32 = len.parse().map_err(|_| malformed())?;
    // the first line after the range must still be addressable
    if start.checked_add(len.max(1)).is_none() {
        return Err(malformed());
    }
    Ok((start, len))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HunkKey {
    pub source: String,
    pub target: String,
    pub path: String,
}

/// Hunks retained for one request. Holds at most `capacity` diffs and drops
/// the oldest entry first.
pub struct HunkCache {
    capacity: usize,
    entries: Mutex<IndexMap<HunkKey, Arc<Vec<Hunk>>>>,
}

impl HunkCache {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CodenavError::Configuration(
                "hunk cache size must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &HunkKey) -> Option<Arc<Vec<Hunk>>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: HunkKey, hunks: Arc<Vec<Hunk>>) {
        let mut entries = self.entries.lock();
        entries.insert(key, hunks);
        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
    }
}

//! Upload cache: insertion-ordered uploads plus an id index under one lock.

use crate::Upload;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    /// Every inserted upload in insertion order, duplicates included
    uploads: Arc<Vec<Upload>>,
    /// Latest upload per id
    uploads_by_id: HashMap<i32, Upload>,
}

/// Uploads visible to one request.
///
/// The ordered view keeps every insert; the id index is last-write-wins.
/// Both views change together under the write lock, so readers never see
/// one updated without the other.
#[derive(Default)]
pub struct UploadCache {
    inner: RwLock<Inner>,
}

impl UploadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the ordered view. Later inserts do not show up in a
    /// snapshot already handed out.
    pub fn all(&self) -> Arc<Vec<Upload>> {
        Arc::clone(&self.inner.read().uploads)
    }

    /// Upload at `index` in insertion order, `None` when out of range.
    pub fn at(&self, index: usize) -> Option<Upload> {
        self.inner.read().uploads.get(index).cloned()
    }

    pub fn lookup(&self, id: i32) -> Option<Upload> {
        self.inner.read().uploads_by_id.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to the ordered view and overwrite the id entry.
    pub fn insert(&self, upload: Upload) {
        let mut inner = self.inner.write();
        inner.uploads_by_id.insert(upload.id, upload.clone());
        Arc::make_mut(&mut inner.uploads).push(upload);
    }

    /// Overwrite id entries from a refined upload set. The ordered view is
    /// left alone and ids missing from `uploads` are kept.
    pub fn refresh(&self, uploads: &[Upload]) {
        let mut inner = self.inner.write();
        for upload in uploads {
            inner.uploads_by_id.insert(upload.id, upload.clone());
        }
    }
}

//! Named tags and their image-file buckets.

use std::sync::Arc;

use parking_lot::RwLock;

use super::image_file::ImageFile;

/// A named label over a set of image files.
///
/// Tags do not own the records' lifetime: the catalog routes records
/// in on insertion and purges them on removal. A tag persists once
/// created, even when its bucket is empty.
#[derive(Debug)]
pub struct Tag {
    name: String,
    image_files: RwLock<Vec<Arc<ImageFile>>>,
}

impl Tag {
    /// Create an empty tag.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_files: RwLock::new(Vec::new()),
        }
    }

    /// The tag's name, unique within its catalog.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a record into the bucket, keeping it alphabetized by
    /// filename without extension (case-insensitive).
    pub fn insert_image_file(&self, image_file: Arc<ImageFile>) {
        let mut bucket = self.image_files.write();
        let key = image_file.filename_without_extension().to_lowercase();
        let index = match bucket.binary_search_by(|probe| {
            probe
                .filename_without_extension()
                .to_lowercase()
                .cmp(&key)
        }) {
            Ok(index) | Err(index) => index,
        };
        bucket.insert(index, image_file);
    }

    /// Remove every reference to the record at `path` from the bucket.
    pub fn remove_image_file(&self, path: &std::path::Path) {
        self.image_files.write().retain(|file| file.path() != path);
    }

    /// Records currently in the bucket, in alphabetized order.
    #[must_use]
    pub fn image_files(&self) -> Vec<Arc<ImageFile>> {
        self.image_files.read().clone()
    }

    /// Number of records in the bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.image_files.read().len()
    }

    /// Check whether the bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image_files.read().is_empty()
    }
}

//! The catalog: display-ordered image files plus derived indexes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use super::events::CatalogEvent;
use super::image_file::ImageFile;
use super::tag::Tag;

/// Capacity of the observer broadcast channel. Slow observers see
/// `Lagged` rather than blocking catalog mutations.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A catalog of the image files found in one folder.
///
/// `image_files` is the display order; `by_path` mirrors its
/// membership exactly. Every record routes into either one or more
/// tag buckets or the untagged bucket, never both. All mutation
/// methods must be called from the single apply task that owns write
/// access; observers receive [`CatalogEvent`]s in mutation order.
///
/// Index arguments are trusted: passing an out-of-range index is a
/// programming error and panics, since it indicates invariant
/// corruption rather than an environmental failure.
#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    image_files: Vec<Arc<ImageFile>>,
    by_path: HashMap<PathBuf, Arc<ImageFile>>,
    untagged: Vec<Arc<ImageFile>>,
    tags: Vec<Arc<Tag>>,
    tags_by_name: HashMap<String, Arc<Tag>>,
    events: broadcast::Sender<CatalogEvent>,
}

impl Catalog {
    /// Create an empty catalog for the given root folder.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            root: root.into(),
            image_files: Vec::new(),
            by_path: HashMap::new(),
            untagged: Vec::new(),
            tags: Vec::new(),
            tags_by_name: HashMap::new(),
            events,
        }
    }

    /// The folder this catalog mirrors.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subscribe to catalog change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    // Querying

    /// Look up a record by path.
    #[must_use]
    pub fn image_file_for_path(&self, path: &Path) -> Option<Arc<ImageFile>> {
        self.by_path.get(path).cloned()
    }

    /// Records in display order.
    #[must_use]
    pub fn image_files(&self) -> &[Arc<ImageFile>] {
        &self.image_files
    }

    /// Untagged records, alphabetized by filename without extension.
    #[must_use]
    pub fn untagged_image_files(&self) -> &[Arc<ImageFile>] {
        &self.untagged
    }

    /// Tags in alphabetized order.
    #[must_use]
    pub fn tags(&self) -> &[Arc<Tag>] {
        &self.tags
    }

    /// Look up a tag by name.
    #[must_use]
    pub fn tag_with_name(&self, name: &str) -> Option<Arc<Tag>> {
        self.tags_by_name.get(name).cloned()
    }

    /// Number of records in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.image_files.len()
    }

    /// Check whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image_files.is_empty()
    }

    /// Snapshot of every record's path and cached modification time,
    /// used as the reconciliation baseline by scans. Built from the
    /// path index, whose membership always equals `image_files`.
    #[must_use]
    pub fn mtime_snapshot(&self) -> HashMap<PathBuf, DateTime<Utc>> {
        self.by_path
            .iter()
            .map(|(path, file)| (path.clone(), file.date_last_updated()))
            .collect()
    }

    // Modifying the list of image files

    /// Append a record at the end of the display order.
    pub fn add_image_file(&mut self, image_file: Arc<ImageFile>) {
        self.insert_image_file(image_file, self.image_files.len());
    }

    /// Insert a record at `index`, routing it into its tag buckets
    /// (creating missing tags) or the untagged bucket.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of the display order.
    pub fn insert_image_file(&mut self, image_file: Arc<ImageFile>, index: usize) {
        self.insert_inner(image_file.clone(), index);
        self.emit(CatalogEvent::FileInserted {
            index,
            file: image_file.info(),
        });
    }

    /// Remove a record wherever it appears. Tags it was routed into
    /// persist with the record purged from their buckets.
    pub fn remove_image_file(&mut self, image_file: &Arc<ImageFile>) {
        if let Some((index, removed)) = self.remove_inner(image_file.path()) {
            self.emit(CatalogEvent::FileRemoved {
                index,
                file: removed.info(),
            });
        }
    }

    /// Remove the record at `index` in the display order.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove_image_file_at(&mut self, index: usize) {
        assert!(index < self.image_files.len(), "removal index out of range");
        let image_file = self.image_files[index].clone();
        self.remove_image_file(&image_file);
    }

    /// Reposition the record at `from` so it ends up at `to` in the
    /// display order. Implemented as remove-then-reinsert; the target
    /// shifts down by one when it follows the source, to account for
    /// the removal.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn move_image_file(&mut self, from: usize, to: usize) {
        let count = self.image_files.len();
        assert!(from < count, "move source index out of range");
        assert!(to < count, "move target index out of range");

        let image_file = self.image_files[from].clone();
        self.remove_inner(image_file.path());
        let adjusted = if to <= from { to } else { to - 1 };
        self.insert_inner(image_file, adjusted);

        self.emit(CatalogEvent::FileMoved { from, to });
    }

    /// Refresh a record's cached modification time after its file
    /// changed on disk.
    pub fn refresh_image_file(&mut self, path: &Path, modified: DateTime<Utc>) {
        let Some(index) = self.image_files.iter().position(|f| f.path() == path) else {
            tracing::debug!(path = %path.display(), "Refresh for unknown file, ignoring");
            return;
        };

        let image_file = self.image_files[index].clone();
        image_file.touch(modified);
        self.emit(CatalogEvent::FileRefreshed {
            index,
            file: image_file.info(),
        });
    }

    // Modifying the list of tags

    /// Look up a tag, creating it (and inserting it into the
    /// alphabetized tag list) if it does not exist yet.
    pub fn add_tag_with_name(&mut self, name: &str) -> Arc<Tag> {
        if let Some(tag) = self.tags_by_name.get(name) {
            return Arc::clone(tag);
        }

        let tag = Arc::new(Tag::new(name));
        self.tags_by_name.insert(name.to_string(), Arc::clone(&tag));

        // Binary-search and insert, in the alphabetized tags list.
        let key = name.to_lowercase();
        let index = match self
            .tags
            .binary_search_by(|probe| probe.name().to_lowercase().cmp(&key))
        {
            Ok(index) | Err(index) => index,
        };
        self.tags.insert(index, Arc::clone(&tag));

        self.emit(CatalogEvent::TagAdded {
            index,
            name: name.to_string(),
        });
        tag
    }

    // Internals

    fn insert_inner(&mut self, image_file: Arc<ImageFile>, index: usize) {
        assert!(
            index <= self.image_files.len(),
            "insertion index out of range"
        );

        // Route into tag buckets, or the untagged bucket when the
        // record carries no tags.
        if image_file.tag_names().is_empty() {
            let key = image_file.filename_without_extension().to_lowercase();
            let untagged_index = match self.untagged.binary_search_by(|probe| {
                probe.filename_without_extension().to_lowercase().cmp(&key)
            }) {
                Ok(i) | Err(i) => i,
            };
            self.untagged.insert(untagged_index, Arc::clone(&image_file));
        } else {
            for tag_name in image_file.tag_names() {
                let tag = self.add_tag_with_name(tag_name);
                tag.insert_image_file(Arc::clone(&image_file));
            }
        }

        self.by_path
            .insert(image_file.path().to_path_buf(), Arc::clone(&image_file));
        self.image_files.insert(index, image_file);
    }

    fn remove_inner(&mut self, path: &Path) -> Option<(usize, Arc<ImageFile>)> {
        let index = self.image_files.iter().position(|f| f.path() == path)?;
        let image_file = self.image_files.remove(index);

        self.by_path.remove(path);
        self.untagged.retain(|f| f.path() != path);
        for tag_name in image_file.tag_names() {
            if let Some(tag) = self.tags_by_name.get(tag_name) {
                tag.remove_image_file(path);
            }
        }

        Some((index, image_file))
    }

    fn emit(&self, event: CatalogEvent) {
        // Send fails only when no observer is subscribed.
        let _ = self.events.send(event);
    }
}

//! Directory enumeration and catalog reconciliation.
//!
//! Enumerates a single directory level and diffs the listing against a
//! snapshot of the catalog, classifying every image file as added,
//! changed, or removed.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::filter::ImageFilter;
use crate::error::ScanError;

/// One enumerated directory entry with the metadata the reconciler
/// needs. `modified` is `None` when the timestamp probe failed for
/// this entry alone.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Entry path.
    pub path: PathBuf,
    /// Whether the entry is a regular file (not a directory, symlink
    /// or other special entry).
    pub is_regular: bool,
    /// Modification time, when it could be read.
    pub modified: Option<DateTime<Utc>>,
}

/// The classification a reconciliation scan produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Files on disk with no catalog record.
    pub added: Vec<PathBuf>,
    /// Known files whose on-disk mtime is strictly newer than the
    /// cached one, paired with the new mtime.
    pub changed: Vec<(PathBuf, DateTime<Utc>)>,
    /// Catalog records whose file no longer exists in the listing.
    pub removed: Vec<PathBuf>,
}

impl Delta {
    /// Check whether the delta contains no classifications.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Total number of classified files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.removed.len()
    }
}

/// Enumerate the immediate children of `root`.
///
/// Does not descend into subdirectories. Entries whose basic metadata
/// cannot be read are logged and skipped; an unreadable mtime alone
/// leaves the entry in the listing with `modified: None`.
///
/// # Errors
///
/// Returns [`ScanError::Enumeration`] if `root` itself cannot be read,
/// or [`ScanError::Cancelled`] if the token fires mid-listing.
pub fn list_directory(root: &Path, cancel: &CancellationToken) -> Result<Vec<FileEntry>, ScanError> {
    let read_dir =
        std::fs::read_dir(root).map_err(|e| ScanError::enumeration(root, e.to_string()))?;

    let mut entries = Vec::new();
    for entry in read_dir {
        // Cooperative cancellation, checked per file.
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Error reading directory entry, skipping");
                continue;
            }
        };

        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable entry, skipping");
                continue;
            }
        };

        let modified = match metadata.modified() {
            Ok(time) => Some(time.into()),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No modification time");
                None
            }
        };

        entries.push(FileEntry {
            path,
            is_regular: metadata.is_file(),
            modified,
        });
    }

    Ok(entries)
}

/// Diff a directory listing against a catalog snapshot.
///
/// Entries that are not regular files, or that the filter rejects, are
/// ignored. A known file counts as changed only when its mtime is
/// strictly newer than the cached one; an entry whose mtime probe
/// failed is accounted for but never classified as changed. Every
/// snapshot path absent from the listing is classified as removed.
/// The listing need not be sorted, and repeated paths are only
/// considered once.
#[must_use]
pub fn reconcile(
    snapshot: &HashMap<PathBuf, DateTime<Utc>>,
    listing: &[FileEntry],
    filter: &ImageFilter,
) -> Delta {
    let mut delta = Delta::default();
    let mut accounted: HashSet<&Path> = HashSet::with_capacity(listing.len());

    for entry in listing {
        if !entry.is_regular || !filter.is_image_file(&entry.path) {
            continue;
        }
        if !accounted.insert(entry.path.as_path()) {
            continue;
        }

        if let Some(cached) = snapshot.get(&entry.path) {
            if let Some(modified) = entry.modified {
                if modified > *cached {
                    delta.changed.push((entry.path.clone(), modified));
                }
            }
        } else {
            delta.added.push(entry.path.clone());
        }
    }

    // Everything we knew about that no longer has a listing entry.
    for path in snapshot.keys() {
        if !accounted.contains(path.as_path()) {
            delta.removed.push(path.clone());
        }
    }

    delta
}

//! Image file records and the metadata collaborator interface.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::Result;

/// Source of per-file metadata that lives outside the filesystem's
/// basic attributes: tag names and bracketed-sibling filenames.
///
/// The platform facility that supplies these (Finder tags, sidecar
/// files, an EXIF reader) is a collaborator of the catalog, not part
/// of it. Implementations must be cheap enough to call once per newly
/// discovered file during a scan.
pub trait MetadataSource: Send + Sync {
    /// Tag names applied to the file, in application order. An empty
    /// list routes the file into the untagged bucket.
    fn tag_names(&self, path: &Path) -> Vec<String>;

    /// Filenames of the file's exposure-bracketed siblings, if any.
    /// Carried opaquely on the record for the export feature.
    fn bracketed_siblings(&self, _path: &Path) -> Vec<String> {
        Vec::new()
    }
}

/// Metadata source that reports no tags and no siblings; every file
/// lands in the untagged bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyMetadata;

impl MetadataSource for EmptyMetadata {
    fn tag_names(&self, _path: &Path) -> Vec<String> {
        Vec::new()
    }
}

/// One on-disk image file known to the catalog.
///
/// The path is the record's identity: no two records in a catalog
/// share one. `date_last_updated` is the only mutable attribute; it is
/// refreshed in place when a scan classifies the file as changed, so
/// it sits behind a lock while everything else stays plain data.
#[derive(Debug)]
pub struct ImageFile {
    path: PathBuf,
    filename_without_extension: String,
    tag_names: Vec<String>,
    date_last_updated: RwLock<DateTime<Utc>>,
    bracketed_siblings: Vec<String>,
}

impl ImageFile {
    /// Create a record from already-known attributes.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        tag_names: Vec<String>,
        date_last_updated: DateTime<Utc>,
    ) -> Self {
        let path = path.into();
        let filename_without_extension = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path,
            filename_without_extension,
            tag_names,
            date_last_updated: RwLock::new(date_last_updated),
            bracketed_siblings: Vec::new(),
        }
    }

    /// Attach bracketed-sibling filenames to the record.
    #[must_use]
    pub fn with_bracketed_siblings(mut self, siblings: Vec<String>) -> Self {
        self.bracketed_siblings = siblings;
        self
    }

    /// Build a record by reading the file's metadata from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's basic attributes cannot be read;
    /// callers skip the file and continue.
    pub fn from_disk(path: &Path, metadata: &dyn MetadataSource) -> Result<Self> {
        let attrs = std::fs::metadata(path)?;
        let modified: DateTime<Utc> = attrs.modified()?.into();

        Ok(
            Self::new(path, metadata.tag_names(path), modified)
                .with_bracketed_siblings(metadata.bracketed_siblings(path)),
        )
    }

    /// The file's path, unique within its catalog.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filename with the extension stripped, used for alphabetized
    /// ordering of the untagged bucket and tag buckets.
    #[must_use]
    pub fn filename_without_extension(&self) -> &str {
        &self.filename_without_extension
    }

    /// Tag names applied to the file, in application order.
    #[must_use]
    pub fn tag_names(&self) -> &[String] {
        &self.tag_names
    }

    /// Last-known modification time.
    #[must_use]
    pub fn date_last_updated(&self) -> DateTime<Utc> {
        *self.date_last_updated.read()
    }

    /// Refresh the cached modification time after the file changed on
    /// disk.
    pub fn touch(&self, modified: DateTime<Utc>) {
        *self.date_last_updated.write() = modified;
    }

    /// Bracketed-sibling filenames, opaque to the catalog.
    #[must_use]
    pub fn bracketed_siblings(&self) -> &[String] {
        &self.bracketed_siblings
    }

    /// Read-only snapshot of the record, for observers.
    #[must_use]
    pub fn info(&self) -> ImageFileInfo {
        ImageFileInfo {
            path: self.path.clone(),
            filename_without_extension: self.filename_without_extension.clone(),
            tag_names: self.tag_names.clone(),
            date_last_updated: self.date_last_updated(),
            bracketed_siblings: self.bracketed_siblings.clone(),
        }
    }
}

/// Read-only snapshot of an [`ImageFile`], handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFileInfo {
    /// File path, unique within the catalog.
    pub path: PathBuf,
    /// Filename with the extension stripped.
    pub filename_without_extension: String,
    /// Tag names applied to the file.
    pub tag_names: Vec<String>,
    /// Last-known modification time.
    pub date_last_updated: DateTime<Utc>,
    /// Bracketed-sibling filenames.
    pub bracketed_siblings: Vec<String>,
}

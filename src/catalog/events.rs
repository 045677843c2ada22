//! Typed catalog change notifications.

use serde::Serialize;

use super::image_file::ImageFileInfo;

/// A change to the catalog, delivered to observers in the order the
/// mutations were applied. Indices refer to the display-ordered
/// `image_files` sequence at the moment the event was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogEvent {
    /// A record was inserted at `index`.
    FileInserted { index: usize, file: ImageFileInfo },
    /// The record previously at `index` was removed.
    FileRemoved { index: usize, file: ImageFileInfo },
    /// A record was repositioned from `from` to `to`.
    FileMoved { from: usize, to: usize },
    /// The record at `index` had its modification time refreshed.
    FileRefreshed { index: usize, file: ImageFileInfo },
    /// A tag was created and inserted into the alphabetized tag list
    /// at `index`.
    TagAdded { index: usize, name: String },
}

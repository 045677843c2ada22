//! The image catalog and its derived indexes.
//!
//! This module provides:
//! - [`ImageFile`] records with refreshable modification times
//! - [`Tag`] buckets and the alphabetized tag list
//! - [`Catalog`], the single-writer collection with typed change
//!   notifications for observers

mod collection;
mod events;
mod image_file;
mod tag;

pub use collection::Catalog;
pub use events::CatalogEvent;
pub use image_file::{EmptyMetadata, ImageFile, ImageFileInfo, MetadataSource};
pub use tag::Tag;

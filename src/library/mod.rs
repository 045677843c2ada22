//! The library: a catalog kept live against one folder.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::catalog::{Catalog, CatalogEvent, EmptyMetadata, ImageFileInfo, MetadataSource};
use crate::watcher::{ImageFilter, Reconciler};
use crate::{Config, Result};

/// A photo library rooted at one folder.
///
/// Owns the catalog and the reconciler that keeps it live. Opening a
/// library kicks off the initial population scan; from then on the
/// catalog follows the folder until [`shutdown`](Self::shutdown).
///
/// The catalog is rebuilt from disk state on every open; nothing is
/// persisted between runs.
#[derive(Debug)]
pub struct Library {
    catalog: Arc<RwLock<Catalog>>,
    reconciler: Option<Reconciler>,
}

impl Library {
    /// Open a library for the folder in `config`, with no tag
    /// metadata (every file goes to the untagged bucket).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid. A missing or
    /// unreadable folder is not an open error: the watch and the scan
    /// report it and the catalog stays empty until the folder appears.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_with(config, ImageFilter::new(), Arc::new(EmptyMetadata))
    }

    /// Open a library with a custom image filter and metadata source.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn open_with(
        config: &Config,
        filter: ImageFilter,
        metadata: Arc<dyn MetadataSource>,
    ) -> Result<Self> {
        config.validate()?;

        let catalog = Arc::new(RwLock::new(Catalog::new(&config.root_dir)));
        let reconciler = Reconciler::start(
            config.root_dir.clone(),
            Arc::clone(&catalog),
            filter,
            metadata,
            config.debounce(),
        );

        tracing::info!(root = %config.root_dir.display(), "Library opened");
        Ok(Self {
            catalog,
            reconciler: Some(reconciler),
        })
    }

    /// Shared handle to the catalog. Reads are safe from any task;
    /// writes belong to the reconciler's apply task alone.
    #[must_use]
    pub fn catalog(&self) -> Arc<RwLock<Catalog>> {
        Arc::clone(&self.catalog)
    }

    /// Subscribe to catalog change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.catalog.read().subscribe()
    }

    /// Read-only snapshot of the records in display order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ImageFileInfo> {
        self.catalog
            .read()
            .image_files()
            .iter()
            .map(|file| file.info())
            .collect()
    }

    /// Whether live change notifications are being received.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.reconciler
            .as_ref()
            .is_some_and(Reconciler::is_watching)
    }

    /// Reconcile with the folder now, superseding any running scan.
    pub fn rescan(&self) {
        if let Some(reconciler) = &self.reconciler {
            reconciler.trigger_scan();
        }
    }

    /// Stop watching and cancel outstanding scan work. Must be called
    /// before the library is dropped when an orderly teardown is
    /// wanted; dropping without it performs the same steps.
    pub fn shutdown(&mut self) {
        if let Some(mut reconciler) = self.reconciler.take() {
            reconciler.shutdown();
        }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        self.shutdown();
    }
}

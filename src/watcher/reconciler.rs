//! Scan orchestration: from change notification to applied delta.
//!
//! The reconciler ties the pieces together. The notifier's handler
//! does nothing but wake the notification loop; the notification loop
//! does nothing but submit scans; scans enumerate and diff on a
//! blocking worker; and every catalog mutation funnels through the
//! single apply task, which is also where observers are notified.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::filter::ImageFilter;
use super::notifier::ChangeNotifier;
use super::scan_queue::ScanQueue;
use super::scanner::{list_directory, reconcile, Delta};
use crate::catalog::{Catalog, ImageFile, MetadataSource};
use crate::error::ScanError;

const NOTIFY_CHANNEL_CAPACITY: usize = 16;
const APPLY_CHANNEL_CAPACITY: usize = 8;

/// One scan's worth of catalog mutations, delivered to the apply task
/// as a unit. Records for added files are fully built on the scan
/// worker; the apply task only splices state.
struct ApplyBatch {
    removed: Vec<PathBuf>,
    changed: Vec<(PathBuf, DateTime<Utc>)>,
    added: Vec<ImageFile>,
    /// Acknowledged once applied, so the scan slot stays held until
    /// the catalog reflects this batch.
    done: Option<oneshot::Sender<()>>,
}

/// Everything a scan needs, shared between the notification loop and
/// the scan tasks it spawns.
struct ScanContext {
    root: PathBuf,
    catalog: Arc<RwLock<Catalog>>,
    filter: Arc<ImageFilter>,
    metadata: Arc<dyn MetadataSource>,
    queue: ScanQueue,
    apply_tx: mpsc::Sender<ApplyBatch>,
}

impl ScanContext {
    /// Supersede any running scan and start a fresh one.
    fn trigger_scan(self: &Arc<Self>) {
        let ctx = Arc::clone(self);
        self.queue.submit(move |cancel| async move {
            ctx.run_scan(cancel).await;
        });
    }

    async fn run_scan(&self, cancel: CancellationToken) {
        let snapshot = self.catalog.read().mtime_snapshot();
        let root = self.root.clone();
        let filter = Arc::clone(&self.filter);
        let metadata = Arc::clone(&self.metadata);
        let scan_cancel = cancel.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let listing = list_directory(&root, &scan_cancel)?;
            let delta = reconcile(&snapshot, &listing, &filter);
            if scan_cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            build_batch(delta, metadata.as_ref(), &scan_cancel)
        })
        .await;

        match outcome {
            Ok(Ok(batch)) => {
                if cancel.is_cancelled() {
                    tracing::debug!("Discarding superseded delta");
                    return;
                }
                self.deliver(batch).await;
            }
            Ok(Err(ScanError::Cancelled)) => {
                tracing::debug!("Scan cancelled");
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    root = %self.root.display(),
                    error = %e,
                    "Scan failed, catalog left unchanged"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Scan task failed");
            }
        }
    }

    async fn deliver(&self, mut batch: ApplyBatch) {
        let (done_tx, done_rx) = oneshot::channel();
        batch.done = Some(done_tx);

        if self.apply_tx.send(batch).await.is_err() {
            tracing::debug!("Apply task gone, discarding delta");
            return;
        }
        // Hold the scan slot until the delta is applied, so the next
        // scan's snapshot reflects it.
        let _ = done_rx.await;
    }
}

/// Build the apply batch for a delta, constructing a full record for
/// every added path. Files whose metadata cannot be read are skipped;
/// the next scan picks them up if they become readable.
fn build_batch(
    delta: Delta,
    metadata: &dyn MetadataSource,
    cancel: &CancellationToken,
) -> Result<ApplyBatch, ScanError> {
    let mut added = Vec::with_capacity(delta.added.len());
    for path in delta.added {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        match ImageFile::from_disk(&path, metadata) {
            Ok(file) => added.push(file),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
            }
        }
    }

    Ok(ApplyBatch {
        removed: delta.removed,
        changed: delta.changed,
        added,
        done: None,
    })
}

/// Apply one batch: removals first, then timestamp refreshes, then new
/// arrivals appended in discovery order.
fn apply_batch(catalog: &mut Catalog, batch: ApplyBatch) {
    for path in &batch.removed {
        if let Some(file) = catalog.image_file_for_path(path) {
            catalog.remove_image_file(&file);
        } else {
            tracing::debug!(path = %path.display(), "Removal for unknown file, ignoring");
        }
    }

    for (path, modified) in &batch.changed {
        catalog.refresh_image_file(path, *modified);
    }

    for file in batch.added {
        if catalog.image_file_for_path(file.path()).is_some() {
            tracing::debug!(path = %file.path().display(), "File already cataloged, skipping add");
            continue;
        }
        catalog.add_image_file(Arc::new(file));
    }
}

/// The apply task: sole writer of the catalog.
async fn apply_loop(catalog: Arc<RwLock<Catalog>>, mut apply_rx: mpsc::Receiver<ApplyBatch>) {
    while let Some(mut batch) = apply_rx.recv().await {
        let done = batch.done.take();
        let (removed, changed, added) = (batch.removed.len(), batch.changed.len(), batch.added.len());

        {
            let mut catalog = catalog.write();
            apply_batch(&mut catalog, batch);
        }

        if removed + changed + added > 0 {
            tracing::info!(added, changed, removed, "Applied catalog delta");
        }
        if let Some(done) = done {
            let _ = done.send(());
        }
    }
    tracing::debug!("Apply channel closed, apply task exiting");
}

/// Watches a folder and keeps a catalog reconciled with it.
///
/// Owns the change notifier, the scan queue, and the apply task.
/// Construction performs an initial population scan. Teardown order
/// matters: the handler is detached before the subscription is
/// canceled, then in-flight scan work is canceled and its result (if
/// any) discarded.
pub struct Reconciler {
    ctx: Arc<ScanContext>,
    notifier: ChangeNotifier,
    notify_task: JoinHandle<()>,
    apply_task: JoinHandle<()>,
    shut_down: bool,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("root", &self.ctx.root)
            .field("watching", &self.notifier.is_active())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Start reconciling `root` into `catalog`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(
        root: PathBuf,
        catalog: Arc<RwLock<Catalog>>,
        filter: ImageFilter,
        metadata: Arc<dyn MetadataSource>,
        debounce: Duration,
    ) -> Self {
        let (apply_tx, apply_rx) = mpsc::channel(APPLY_CHANNEL_CAPACITY);
        let ctx = Arc::new(ScanContext {
            root: root.clone(),
            catalog: Arc::clone(&catalog),
            filter: Arc::new(filter),
            metadata,
            queue: ScanQueue::new(),
            apply_tx,
        });

        let apply_task = tokio::spawn(apply_loop(catalog, apply_rx));

        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(NOTIFY_CHANNEL_CAPACITY);
        let notifier = ChangeNotifier::start(&root, debounce, move || {
            // A full queue already has a scan wake-up pending.
            let _ = notify_tx.try_send(());
        });

        let notify_ctx = Arc::clone(&ctx);
        let notify_task = tokio::spawn(async move {
            while notify_rx.recv().await.is_some() {
                notify_ctx.trigger_scan();
            }
        });

        // Populate the catalog from current disk state.
        ctx.trigger_scan();

        Self {
            ctx,
            notifier,
            notify_task,
            apply_task,
            shut_down: false,
        }
    }

    /// Supersede any running scan and reconcile now.
    pub fn trigger_scan(&self) {
        self.ctx.trigger_scan();
    }

    /// Whether live change notifications are being received.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.notifier.is_active()
    }

    /// Stop watching and cancel outstanding work. Any already-computed
    /// scan result is discarded rather than applied.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        // Detach before cancel: no handler invocation after this line.
        self.notifier.detach();
        self.notifier.cancel();
        self.ctx.queue.cancel_all();
        self.notify_task.abort();
        self.apply_task.abort();

        tracing::debug!(root = %self.ctx.root.display(), "Reconciler shut down");
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

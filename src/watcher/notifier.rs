//! Folder change notifications using notify-rs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use parking_lot::Mutex;

use crate::error::WatcherError;

/// Callback invoked when something in the watched folder changed.
type ChangeHandler = Box<dyn FnMut() + Send>;

/// Watches one folder and invokes a handler when its contents change.
///
/// Change bursts are coalesced by the debouncer, so the handler fires
/// once per settled burst, always from the notifier's own worker. The
/// handler lives in a mutex-guarded slot: invoking it and detaching it
/// are mutually exclusive, which is what lets [`detach`](Self::detach)
/// guarantee no invocation happens after it returns.
/// [`cancel`](Self::cancel) alone does not give that guarantee — an
/// invocation already past the slot check may still be running — so
/// owners tear down with `detach()` first, then `cancel()`.
///
/// If the OS subscription cannot be created the notifier stays inert:
/// it logs the failure, never fires, and the rest of the application
/// keeps working from its last scan.
pub struct ChangeNotifier {
    root: PathBuf,
    handler: Arc<Mutex<Option<ChangeHandler>>>,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("root", &self.root)
            .field("active", &self.debouncer.is_some())
            .finish_non_exhaustive()
    }
}

/// Invoke the handler in the slot, if one is still attached.
fn dispatch_change(slot: &Mutex<Option<ChangeHandler>>) {
    let mut guard = slot.lock();
    if let Some(handler) = guard.as_mut() {
        handler();
    }
}

impl ChangeNotifier {
    /// Start watching `root`, invoking `on_change` for every settled
    /// burst of filesystem changes.
    ///
    /// Subscription failures are reported through the log; the
    /// returned notifier is then inert ([`is_active`](Self::is_active)
    /// returns false) rather than the construction failing.
    pub fn start(root: &Path, debounce: Duration, on_change: impl FnMut() + Send + 'static) -> Self {
        let handler: Arc<Mutex<Option<ChangeHandler>>> =
            Arc::new(Mutex::new(Some(Box::new(on_change))));

        let debouncer = match Self::subscribe(root, debounce, Arc::clone(&handler)) {
            Ok(debouncer) => {
                tracing::info!(path = %root.display(), "Watching folder");
                Some(debouncer)
            }
            Err(e) => {
                tracing::warn!(
                    path = %root.display(),
                    error = %e,
                    "Change notifications disabled"
                );
                None
            }
        };

        Self {
            root: root.to_path_buf(),
            handler,
            debouncer,
        }
    }

    /// Create the debounced OS subscription feeding the handler slot.
    fn subscribe(
        root: &Path,
        debounce: Duration,
        slot: Arc<Mutex<Option<ChangeHandler>>>,
    ) -> Result<Debouncer<RecommendedWatcher>, WatcherError> {
        let mut debouncer = new_debouncer(
            debounce,
            move |result: std::result::Result<
                Vec<notify_debouncer_mini::DebouncedEvent>,
                notify::Error,
            >| {
                match result {
                    Ok(events) => {
                        // Only "something changed" matters, not which path.
                        if events
                            .iter()
                            .any(|event| matches!(event.kind, DebouncedEventKind::Any))
                        {
                            dispatch_change(&slot);
                        }
                    }
                    Err(e) => {
                        tracing::error!("Watch error: {:?}", e);
                    }
                }
            },
        )
        .map_err(|e| WatcherError::InitFailed(e.to_string()))?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::WatchFailed {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(debouncer)
    }

    /// The folder being watched.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the OS subscription is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.debouncer.is_some()
    }

    /// Clear the handler slot. Once this returns, the handler will
    /// never be invoked again, even if the subscription is still live.
    pub fn detach(&self) {
        *self.handler.lock() = None;
    }

    /// Stop the OS subscription and its worker. Does not by itself
    /// guarantee the handler won't fire one more time; call
    /// [`detach`](Self::detach) first for that.
    pub fn cancel(&mut self) {
        if self.debouncer.take().is_some() {
            tracing::info!(path = %self.root.display(), "Stopped watching folder");
        }
    }
}

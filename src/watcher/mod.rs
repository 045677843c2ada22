//! Live folder watching and catalog reconciliation.
//!
//! This module provides:
//! - [`ChangeNotifier`]: debounced OS change notifications with a
//!   detachable handler
//! - [`ScanQueue`]: single-concurrency, supersede-on-submit scan
//!   scheduling
//! - [`reconcile`]: the pure added/changed/removed classification
//! - [`Reconciler`]: the orchestrator that applies deltas on a single
//!   apply task

mod filter;
mod notifier;
mod reconciler;
mod scan_queue;
mod scanner;

pub use filter::ImageFilter;
pub use notifier::ChangeNotifier;
pub use reconciler::Reconciler;
pub use scan_queue::ScanQueue;
pub use scanner::{list_directory, reconcile, Delta, FileEntry};

//! Integration tests for the live catalog: initial population,
//! reconciliation deltas, and the observer event feed.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use folio::catalog::{CatalogEvent, MetadataSource};
use folio::watcher::ImageFilter;
use folio::{Config, Library};
use tempfile::TempDir;

/// Tag source keyed on filename stems, standing in for the platform
/// tag facility.
struct StemTags;

impl MetadataSource for StemTags {
    fn tag_names(&self, path: &Path) -> Vec<String> {
        match path.file_stem().and_then(|s| s.to_str()) {
            Some("img2") => vec!["sunset".to_string()],
            _ => vec![],
        }
    }
}

fn test_config(root: &Path) -> Config {
    let mut config = Config::new(root);
    config.debounce_ms = 100;
    config
}

/// Poll until `predicate` holds, or panic after a few seconds.
async fn wait_for(what: &str, predicate: impl Fn() -> bool) {
    for _ in 0..100 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for: {what}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_initial_scan_routes_tags_and_untagged() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("img1.jpg"), b"one").unwrap();
    fs::write(tmp.path().join("img2.jpg"), b"two").unwrap();

    let mut library = Library::open_with(
        &test_config(tmp.path()),
        ImageFilter::new(),
        Arc::new(StemTags),
    )
    .unwrap();

    let catalog = library.catalog();
    wait_for("initial scan", || catalog.read().len() == 2).await;

    let catalog = catalog.read();
    let untagged: Vec<_> = catalog
        .untagged_image_files()
        .iter()
        .map(|f| f.filename_without_extension().to_string())
        .collect();
    assert_eq!(untagged, vec!["img1"]);

    let tags: Vec<_> = catalog.tags().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(tags, vec!["sunset"]);

    let sunset = catalog.tag_with_name("sunset").unwrap();
    let bucket = sunset.image_files();
    assert_eq!(bucket.len(), 1);
    assert_eq!(bucket[0].filename_without_extension(), "img2");

    drop(catalog);
    library.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rescan_applies_added_changed_removed() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("img1.jpg"), b"one").unwrap();
    fs::write(tmp.path().join("img2.jpg"), b"two").unwrap();

    let mut library = Library::open(&test_config(tmp.path())).unwrap();
    let catalog = library.catalog();
    wait_for("initial scan", || catalog.read().len() == 2).await;

    let img2 = tmp.path().join("img2.jpg");
    let before = catalog
        .read()
        .image_file_for_path(&img2)
        .unwrap()
        .date_last_updated();

    // Filesystem mtimes can be second-granular; make the rewrite land
    // strictly later than the cached timestamp.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    fs::remove_file(tmp.path().join("img1.jpg")).unwrap();
    fs::write(tmp.path().join("img3.jpg"), b"three").unwrap();
    fs::write(&img2, b"two, edited").unwrap();

    library.rescan();
    wait_for("delta applied", || {
        let catalog = catalog.read();
        catalog.image_file_for_path(&tmp.path().join("img1.jpg")).is_none()
            && catalog.image_file_for_path(&tmp.path().join("img3.jpg")).is_some()
            && catalog.image_file_for_path(&img2).unwrap().date_last_updated() > before
    })
    .await;

    // Survivors keep their insertion order, arrivals append.
    let order: Vec<_> = catalog
        .read()
        .image_files()
        .iter()
        .map(|f| f.filename_without_extension().to_string())
        .collect();
    assert_eq!(order, vec!["img2", "img3"]);

    library.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rapid_rescans_leave_consistent_catalog() {
    let tmp = TempDir::new().unwrap();
    for i in 0..20 {
        fs::write(tmp.path().join(format!("img{i:02}.jpg")), b"x").unwrap();
    }

    let mut library = Library::open(&test_config(tmp.path())).unwrap();
    let catalog = library.catalog();

    // A burst of triggers coalesces; however they interleave, the
    // catalog must settle at exactly one record per file with the
    // path index matching the display list.
    for _ in 0..10 {
        library.rescan();
    }
    wait_for("catalog settled", || catalog.read().len() == 20).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let catalog = catalog.read();
    assert_eq!(catalog.len(), 20);
    assert_eq!(catalog.mtime_snapshot().len(), catalog.len());
    for file in catalog.image_files() {
        assert!(catalog.image_file_for_path(file.path()).is_some());
    }

    drop(catalog);
    library.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_feed_reports_insertions() {
    let tmp = TempDir::new().unwrap();
    let mut library = Library::open(&test_config(tmp.path())).unwrap();
    let catalog = library.catalog();
    wait_for("initial scan", || catalog.read().is_empty()).await;

    let mut events = library.subscribe();
    fs::write(tmp.path().join("new.jpg"), b"x").unwrap();
    library.rescan();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no event within timeout")
        .unwrap();
    match event {
        CatalogEvent::FileInserted { index, file } => {
            assert_eq!(index, 0);
            assert_eq!(file.filename_without_extension, "new");
        }
        other => panic!("expected FileInserted, got {other:?}"),
    }

    library.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_live_watch_picks_up_new_file() {
    let tmp = TempDir::new().unwrap();
    let mut library = Library::open(&test_config(tmp.path())).unwrap();

    if !library.is_watching() {
        // No notification backend in this environment; the scan paths
        // are covered elsewhere.
        library.shutdown();
        return;
    }

    let catalog = library.catalog();
    wait_for("initial scan", || catalog.read().is_empty()).await;

    fs::write(tmp.path().join("dropped-in.jpg"), b"x").unwrap();
    wait_for("live notification", || {
        catalog
            .read()
            .image_file_for_path(&tmp.path().join("dropped-in.jpg"))
            .is_some()
    })
    .await;

    library.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_stops_event_delivery() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.jpg"), b"x").unwrap();

    let mut library = Library::open(&test_config(tmp.path())).unwrap();
    let catalog = library.catalog();
    wait_for("initial scan", || catalog.read().len() == 1).await;

    library.shutdown();

    // Changes after shutdown are never applied.
    fs::write(tmp.path().join("b.jpg"), b"x").unwrap();
    library.rescan();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(catalog.read().len(), 1);
}

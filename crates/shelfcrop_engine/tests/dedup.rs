mod common;

use std::fs;

use common::{init_logging, png_bytes, url, MapFetcher};
use shelfcrop_core::{ContentHasher, Sha256Hasher};
use shelfcrop_engine::{
    DedupOutcome, DeduplicatingFetcher, FailureKind, FingerprintStore, MemoryFingerprintStore,
};
use tempfile::TempDir;

fn file_count(dir: &std::path::Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn same_content_twice_saves_once() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let bytes = png_bytes(4, 4, 1);
    let fetcher = MapFetcher::new()
        .ok(&url(1), bytes.clone())
        .ok(&url(2), bytes.clone());
    let dedup = DeduplicatingFetcher::new(fetcher);
    let mut seen = MemoryFingerprintStore::new();

    let first = dedup.fetch(&url(1), temp.path(), &mut seen).await;
    let second = dedup.fetch(&url(2), temp.path(), &mut seen).await;

    let image = first.expect("first copy saved");
    assert!(second.is_none());
    assert_eq!(seen.len(), 1);
    assert_eq!(file_count(temp.path()), 1);
    assert_eq!(fs::read(&image.path).unwrap(), bytes);
    assert_eq!(image.fingerprint, Sha256Hasher.hash(&bytes));
}

#[tokio::test]
async fn saved_file_name_embeds_fingerprint_and_format() {
    let temp = TempDir::new().unwrap();
    let bytes = png_bytes(3, 3, 9);
    let dedup = DeduplicatingFetcher::new(MapFetcher::new().ok(&url(1), bytes.clone()));
    let mut seen = MemoryFingerprintStore::new();

    let image = dedup.fetch(&url(1), temp.path(), &mut seen).await.unwrap();
    let name = image.path.file_name().unwrap().to_string_lossy().into_owned();
    let hex = Sha256Hasher.hash(&bytes).to_hex();

    assert_eq!(name, format!("{}.png", image.id));
    assert!(image.id.ends_with(&format!("_{hex}")));
    assert_eq!(image.path.parent().unwrap(), temp.path());
}

#[tokio::test]
async fn failed_fetch_leaves_seen_set_untouched() {
    let temp = TempDir::new().unwrap();
    let fetcher = MapFetcher::new().failing(&url(1), FailureKind::Timeout);
    let dedup = DeduplicatingFetcher::new(fetcher);
    let mut seen = MemoryFingerprintStore::new();

    let outcome = dedup.fetch_outcome(&url(1), temp.path(), &mut seen).await;
    match outcome {
        DedupOutcome::FetchFailed(err) => assert_eq!(err.kind, FailureKind::Timeout),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(seen.is_empty());
    assert_eq!(file_count(temp.path()), 0);
}

#[tokio::test]
async fn inline_references_are_rejected_without_fetching() {
    let temp = TempDir::new().unwrap();
    let fetcher = MapFetcher::new();
    let dedup = DeduplicatingFetcher::new(fetcher.clone());
    let mut seen = MemoryFingerprintStore::new();

    for reference in ["data:image/png;base64,iVBORw0KGgo=", "not a url", ""] {
        let outcome = dedup.fetch_outcome(reference, temp.path(), &mut seen).await;
        match outcome {
            DedupOutcome::FetchFailed(err) => {
                assert_eq!(err.kind, FailureKind::UnfetchableReference)
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn unwritable_destination_is_a_failure_not_a_duplicate() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();
    let bytes = png_bytes(2, 2, 3);
    let dedup = DeduplicatingFetcher::new(MapFetcher::new().ok(&url(1), bytes));
    let mut seen = MemoryFingerprintStore::new();

    let outcome = dedup.fetch_outcome(&url(1), &blocker, &mut seen).await;
    assert!(matches!(outcome, DedupOutcome::WriteFailed(_)));
    assert!(seen.is_empty());
}

//! Integration tests for the catalog contract on the memory backend.
//!
//! Covers the single-latest rule, version monotonicity, cursor pagination,
//! filters, seed import and concurrent publishes.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use catalog_core::{
    Catalog, CatalogError, EntryDetail, ErrorCode, InMemoryEntryStore, OpContext, SEED_VERSION,
};

fn new_catalog() -> Catalog {
    Catalog::new(Arc::new(InMemoryEntryStore::new()))
}

fn filter(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn latest_for(catalog: &Catalog, name: &str) -> Vec<catalog_core::Entry> {
    let (entries, _) = catalog
        .list(&OpContext::background(), &filter(&[("name", name)]), "", 100)
        .await
        .unwrap();
    entries
}

/// Publishing successive versions leaves exactly one latest per name.
#[tokio::test]
async fn test_single_latest_per_name() {
    let catalog = new_catalog();
    let ctx = OpContext::background();

    let first = catalog
        .publish(&ctx, EntryDetail::new("io.github.acme/fs", "1.0.0"))
        .await
        .unwrap();
    let second = catalog
        .publish(&ctx, EntryDetail::new("io.github.acme/fs", "1.1.0"))
        .await
        .unwrap();
    catalog
        .publish(&ctx, EntryDetail::new("io.github.acme/git", "0.1.0"))
        .await
        .unwrap();

    let latest = latest_for(&catalog, "io.github.acme/fs").await;
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, second.id().to_string());
    assert_eq!(latest[0].version_detail.version, "1.1.0");

    // The demoted version is still retrievable by id.
    let old = catalog.get_by_id(&ctx, first.id()).await.unwrap();
    assert!(!old.is_latest());
}

/// A version that is not strictly greater is rejected without writes.
#[tokio::test]
async fn test_publish_rejects_non_increasing_version() {
    let catalog = new_catalog();
    let ctx = OpContext::background();

    let current = catalog
        .publish(&ctx, EntryDetail::new("weather", "1.0.0"))
        .await
        .unwrap();

    for version in ["1.0.0", "0.9.0"] {
        let err = catalog
            .publish(&ctx, EntryDetail::new("weather", version))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidVersion { .. }));
        assert_eq!(err.code(), ErrorCode::VerNotGreater);
    }

    // Raw string order: "10.0.0" sorts before "9.0.0".
    catalog
        .publish(&ctx, EntryDetail::new("weather", "9.0.0"))
        .await
        .unwrap();
    let err = catalog
        .publish(&ctx, EntryDetail::new("weather", "10.0.0"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VerNotGreater);

    let latest = latest_for(&catalog, "weather").await;
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].version_detail.version, "9.0.0");
    assert!(!catalog
        .get_by_id(&ctx, current.id())
        .await
        .unwrap()
        .is_latest());
}

/// Walking all pages returns every latest entry exactly once, in id order.
#[tokio::test]
async fn test_pagination_is_exact() {
    let catalog = new_catalog();
    let ctx = OpContext::background();

    for i in 0..25 {
        catalog
            .publish(&ctx, EntryDetail::new(format!("server-{:02}", i), "1.0.0"))
            .await
            .unwrap();
    }
    // A second version for some names must not add rows.
    for i in 0..5 {
        catalog
            .publish(&ctx, EntryDetail::new(format!("server-{:02}", i), "1.0.1"))
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut page_sizes = Vec::new();
    let mut cursor = String::new();
    loop {
        let (entries, next) = catalog
            .list(&ctx, &HashMap::new(), &cursor, 10)
            .await
            .unwrap();
        page_sizes.push(entries.len());
        seen.extend(entries.into_iter().map(|e| e.id));
        if next.is_empty() {
            break;
        }
        cursor = next;
    }

    assert_eq!(page_sizes, vec![10, 10, 5]);
    assert_eq!(seen.len(), 25);
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), 25);
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(seen, sorted);
}

/// A page that ends exactly at the last entry reports no next cursor.
#[tokio::test]
async fn test_exact_page_boundary_has_no_cursor() {
    let catalog = new_catalog();
    let ctx = OpContext::background();
    for i in 0..3 {
        catalog
            .publish(&ctx, EntryDetail::new(format!("s{}", i), "1.0.0"))
            .await
            .unwrap();
    }

    let (entries, next) = catalog.list(&ctx, &HashMap::new(), "", 3).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(next.is_empty());

    let (entries, next) = catalog.list(&ctx, &HashMap::new(), "", 0).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(next.is_empty());
}

/// Cursors must be well formed and resolve to a stored id.
#[tokio::test]
async fn test_cursor_validity() {
    let catalog = new_catalog();
    let ctx = OpContext::background();
    catalog
        .publish(&ctx, EntryDetail::new("fs", "1.0.0"))
        .await
        .unwrap();

    let err = catalog
        .list(&ctx, &HashMap::new(), "not-a-real-id", 10)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
    assert_eq!(err.code(), ErrorCode::EntCursorNotFound);

    let err = catalog
        .list(&ctx, &HashMap::new(), "bad cursor", 10)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValInvalidCursor);

    let err = catalog
        .list(&ctx, &HashMap::new(), &"x".repeat(300), 10)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValInvalidCursor);
}

/// Filters match exactly and unknown keys are rejected.
#[tokio::test]
async fn test_filter_exactness() {
    let catalog = new_catalog();
    let ctx = OpContext::background();
    catalog
        .publish(&ctx, EntryDetail::new("alpha", "1.0.0"))
        .await
        .unwrap();
    catalog
        .publish(&ctx, EntryDetail::new("alpha-two", "1.0.0"))
        .await
        .unwrap();
    catalog
        .publish(&ctx, EntryDetail::new("beta", "2.0.0"))
        .await
        .unwrap();

    let (by_name, _) = catalog
        .list(&ctx, &filter(&[("name", "alpha")]), "", 10)
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "alpha");

    let (by_version, _) = catalog
        .list(&ctx, &filter(&[("version", "1.0.0")]), "", 10)
        .await
        .unwrap();
    assert_eq!(by_version.len(), 2);

    let (both, _) = catalog
        .list(&ctx, &filter(&[("name", "beta"), ("version", "1.0.0")]), "", 10)
        .await
        .unwrap();
    assert!(both.is_empty());

    let err = catalog
        .list(&ctx, &filter(&[("description", "x")]), "", 10)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValInvalidFilter);
}

/// Invalid seed records are skipped while valid ones are imported.
#[tokio::test]
async fn test_seed_partial_tolerance() {
    let catalog = new_catalog();
    let ctx = OpContext::background();

    let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
    writeln!(file, r#"{{"id":"seed-a","name":"alpha","version_detail":{{"version":"1.0.0","is_latest":true}}}}"#).unwrap();
    writeln!(file, r#"{{"name":"no-id"}}"#).unwrap();
    writeln!(file, "{{not json").unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"id":"seed-b","name":"beta"}}"#).unwrap();
    writeln!(file, r#"{{"id":"seed-c"}}"#).unwrap();

    let report = catalog.import_seed(&ctx, file.path()).await.unwrap();
    assert_eq!(report.total, 5);
    assert_eq!(report.created, 2);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.errors.len(), 3);

    let beta = catalog.get_by_id(&ctx, "seed-b").await.unwrap();
    assert_eq!(beta.version(), SEED_VERSION);
    assert!(beta.is_latest());

    let (entries, _) = catalog.list(&ctx, &HashMap::new(), "", 10).await.unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["seed-a", "seed-b"]);
}

/// Seeding the same id again overwrites every field.
#[tokio::test]
async fn test_seed_upsert_overwrites() {
    let catalog = new_catalog();
    let ctx = OpContext::background();

    let mut first = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        first,
        r#"[{{"id":"s1","name":"fs","description":"old","version_detail":{{"version":"1.0.0","is_latest":true}}}}]"#
    )
    .unwrap();
    catalog.import_seed(&ctx, first.path()).await.unwrap();

    let mut second = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        second,
        r#"[{{"id":"s1","name":"fs","description":"new","version_detail":{{"version":"1.2.0","is_latest":true}}}}]"#
    )
    .unwrap();
    let report = catalog.import_seed(&ctx, second.path()).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.created, 0);

    let stored = catalog.get_by_id(&ctx, "s1").await.unwrap();
    assert_eq!(stored.entry.description, "new");
    assert_eq!(stored.version(), "1.2.0");
}

/// A latest seed record demotes a published entry of the same name.
#[tokio::test]
async fn test_seed_keeps_single_latest() {
    let catalog = new_catalog();
    let ctx = OpContext::background();
    let published = catalog
        .publish(&ctx, EntryDetail::new("fs", "1.0.0"))
        .await
        .unwrap();

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"[{{"id":"seeded-fs","name":"fs"}}]"#).unwrap();
    let report = catalog.import_seed(&ctx, file.path()).await.unwrap();
    assert_eq!(report.demoted, 1);

    let latest = latest_for(&catalog, "fs").await;
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, "seeded-fs");
    assert!(!catalog
        .get_by_id(&ctx, published.id())
        .await
        .unwrap()
        .is_latest());
}

/// A seed file that is not an array fails before any write.
#[tokio::test]
async fn test_seed_rejects_non_array_document() {
    let catalog = new_catalog();
    let ctx = OpContext::background();

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"id":"s1","name":"fs"}}"#).unwrap();

    let err = catalog.import_seed(&ctx, file.path()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Parse { .. }));

    let (entries, _) = catalog.list(&ctx, &HashMap::new(), "", 10).await.unwrap();
    assert!(entries.is_empty());
}

/// Concurrent publishes for one name never leave two latest entries.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publish_same_name() {
    let catalog = Arc::new(new_catalog());

    let mut handles = Vec::new();
    for i in 0..10 {
        let catalog = Arc::clone(&catalog);
        handles.push(tokio::spawn(async move {
            catalog
                .publish(
                    &OpContext::background(),
                    EntryDetail::new("racy", format!("1.0.{}", i)),
                )
                .await
        }));
    }

    let mut accepted = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(stored) => accepted.push(stored.version().to_string()),
            Err(e) => assert_eq!(e.code(), ErrorCode::VerNotGreater),
        }
    }

    assert!(!accepted.is_empty());
    let latest = latest_for(&catalog, "racy").await;
    assert_eq!(latest.len(), 1);
    assert_eq!(
        &latest[0].version_detail.version,
        accepted.iter().max().unwrap()
    );
}

/// Two publishes of the same version: exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publish_same_version() {
    let catalog = Arc::new(new_catalog());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move {
                catalog
                    .publish(&OpContext::background(), EntryDetail::new("dup", "1.0.0"))
                    .await
            })
        })
        .collect();

    let mut wins = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => wins += 1,
            Err(e) => assert_eq!(e.code(), ErrorCode::VerNotGreater),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(latest_for(&catalog, "dup").await.len(), 1);
}

/// An expired context fails the publish and nothing is stored.
#[tokio::test]
async fn test_expired_context_prevents_write() {
    let catalog = new_catalog();
    let ctx = OpContext::with_timeout(Duration::from_millis(1));
    tokio::time::sleep(Duration::from_millis(5)).await;

    let err = catalog
        .publish(&ctx, EntryDetail::new("late", "1.0.0"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::CtxDeadlineExceeded);
    assert!(latest_for(&catalog, "late").await.is_empty());
}

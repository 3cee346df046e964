//! Tests for the in-memory vector index

use std::collections::HashSet;
use std::sync::Arc;

use recs_domain::Error;
use recs_domain::ports::providers::VectorIndexProvider;
use recs_domain::value_objects::{Embedding, IndexConfig, IndexKind, ItemId, ItemRecord};
use recs_providers::InMemoryVectorIndex;
use tempfile::TempDir;

fn emb(values: &[f32]) -> Embedding {
    Embedding::normalized(values.to_vec()).unwrap()
}

fn record(id: u64, values: &[f32]) -> ItemRecord {
    ItemRecord::new(ItemId(id), emb(values))
}

/// Deterministic pseudo-random unit vectors
fn synthetic_records(n: u64, dims: usize) -> Vec<ItemRecord> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..n)
        .map(|id| {
            let values: Vec<f32> = (0..dims)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    ((state % 2000) as f32 / 1000.0) - 1.0 + 1e-3
                })
                .collect();
            record(id, &values)
        })
        .collect()
}

async fn abc_index() -> InMemoryVectorIndex {
    let index = InMemoryVectorIndex::with_dimensions(2);
    index
        .build(vec![
            record(1, &[1.0, 0.0]),
            record(2, &[0.0, 1.0]),
            record(3, &[0.9, 0.1]),
        ])
        .await
        .unwrap();
    index
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_orders_nearest_first() {
    let index = abc_index().await;
    let results = index.search(&emb(&[1.0, 0.0]), 2).await.unwrap();

    let ids: Vec<ItemId> = results.iter().map(|n| n.item_id).collect();
    assert_eq!(ids, vec![ItemId(1), ItemId(3)]);
    assert!((results[0].similarity() - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_search_never_exceeds_k() {
    let index = InMemoryVectorIndex::with_dimensions(8);
    index.build(synthetic_records(50, 8)).await.unwrap();

    for k in [0, 1, 7, 50, 80] {
        let query = emb(&[1.0, 0.5, 0.0, -0.5, 0.2, 0.1, 0.0, 0.3]);
        let results = index.search(&query, k).await.unwrap();
        assert_eq!(results.len(), k.min(50));
        for pair in results.windows(2) {
            assert!(pair[0].similarity() >= pair[1].similarity());
        }
    }
}

#[tokio::test]
async fn test_stored_vector_is_its_own_top_hit() {
    let records = synthetic_records(40, 6);
    let index = InMemoryVectorIndex::with_dimensions(6);
    index.build(records.clone()).await.unwrap();

    for rec in records.iter().take(10) {
        let results = index.search(&rec.embedding, 1).await.unwrap();
        assert_eq!(results[0].item_id, rec.id);
        assert!((results[0].similarity() - 1.0).abs() < 1e-4);
    }
}

#[tokio::test]
async fn test_ties_break_by_item_id() {
    let index = InMemoryVectorIndex::with_dimensions(2);
    index
        .build(vec![record(9, &[0.0, 1.0]), record(4, &[0.0, 1.0]), record(6, &[0.0, 1.0])])
        .await
        .unwrap();
    let results = index.search(&emb(&[1.0, 0.0]), 3).await.unwrap();
    let ids: Vec<u64> = results.iter().map(|n| n.item_id.get()).collect();
    assert_eq!(ids, vec![4, 6, 9]);
}

#[tokio::test]
async fn test_empty_index_returns_empty() {
    let index = InMemoryVectorIndex::with_dimensions(2);
    assert!(index.search(&emb(&[1.0, 0.0]), 5).await.unwrap().is_empty());
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_search_subset_restricts_candidates() {
    let index = abc_index().await;
    let allowed: HashSet<ItemId> = [ItemId(2), ItemId(3)].into_iter().collect();
    let results = index
        .search_subset(&emb(&[1.0, 0.0]), 5, &allowed)
        .await
        .unwrap();
    let ids: Vec<ItemId> = results.iter().map(|n| n.item_id).collect();
    assert_eq!(ids, vec![ItemId(3), ItemId(2)]);

    let none = index
        .search_subset(&emb(&[1.0, 0.0]), 5, &HashSet::new())
        .await
        .unwrap();
    assert!(none.is_empty());
}

// ============================================================================
// Dimension checks
// ============================================================================

#[tokio::test]
async fn test_build_rejects_mismatched_dimension() {
    let index = InMemoryVectorIndex::with_dimensions(2);
    let err = index
        .build(vec![record(1, &[1.0, 0.0]), record(2, &[1.0, 0.0, 0.0])])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_add_and_search_reject_mismatched_dimension() {
    let index = abc_index().await;
    assert!(index.add(ItemId(7), emb(&[1.0, 0.0, 0.0])).await.is_err());
    assert!(index.search(&emb(&[1.0, 0.0, 0.0]), 1).await.is_err());
    assert_eq!(index.len(), 3);
}

// ============================================================================
// Incremental updates
// ============================================================================

#[tokio::test]
async fn test_add_inserts_and_replaces() {
    let index = abc_index().await;
    index.add(ItemId(4), emb(&[-1.0, 0.0])).await.unwrap();
    assert_eq!(index.len(), 4);
    assert!(index.contains(ItemId(4)));

    index.add(ItemId(1), emb(&[0.0, -1.0])).await.unwrap();
    assert_eq!(index.len(), 4);
    let v = index.reconstruct(ItemId(1)).await.unwrap().unwrap();
    assert!((v.as_slice()[1] + 1.0).abs() < 1e-6);

    let top = index.search(&emb(&[1.0, 0.0]), 1).await.unwrap();
    assert_eq!(top[0].item_id, ItemId(3));
}

#[tokio::test]
async fn test_small_delta_does_not_rebuild() {
    let index = InMemoryVectorIndex::with_dimensions(4);
    index.build(synthetic_records(100, 4)).await.unwrap();
    let before = index.stats().rebuilds;

    index.add(ItemId(1000), emb(&[1.0, 2.0, 3.0, 4.0])).await.unwrap();
    let stats = index.stats();
    assert_eq!(stats.rebuilds, before);
    assert_eq!(stats.delta_len, 1);
    assert_eq!(stats.total, 101);
}

#[tokio::test]
async fn test_growth_past_threshold_rebuilds() {
    let index = InMemoryVectorIndex::with_dimensions(4);
    index.build(synthetic_records(20, 4)).await.unwrap();
    let before = index.stats().rebuilds;

    for id in 100..103 {
        index
            .add(ItemId(id), emb(&[1.0, id as f32, 0.0, 1.0]))
            .await
            .unwrap();
    }
    let stats = index.stats();
    assert!(stats.rebuilds > before);
    assert_eq!(stats.total, 23);
    assert!(stats.delta_len <= 2);
}

#[tokio::test]
async fn test_reconstruct_missing_is_none() {
    let index = abc_index().await;
    assert!(index.reconstruct(ItemId(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_reads_during_writes() {
    let index = Arc::new(InMemoryVectorIndex::with_dimensions(4));
    index.build(synthetic_records(200, 4)).await.unwrap();

    let writer = {
        let index = Arc::clone(&index);
        tokio::spawn(async move {
            for id in 1000..1100u64 {
                index
                    .add(ItemId(id), emb(&[1.0, 0.0, id as f32 / 1000.0, 0.5]))
                    .await
                    .unwrap();
            }
        })
    };
    let mut readers = Vec::new();
    for _ in 0..4 {
        let index = Arc::clone(&index);
        readers.push(tokio::spawn(async move {
            for _ in 0..50 {
                let results = index.search(&emb(&[1.0, 0.0, 1.0, 0.5]), 10).await.unwrap();
                assert_eq!(results.len(), 10);
            }
        }));
    }
    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(index.len(), 300);
}

// ============================================================================
// IVF
// ============================================================================

#[tokio::test]
async fn test_ivf_finds_exact_matches() {
    let config = IndexConfig {
        kind: IndexKind::Ivf {
            nlist: 8,
            nprobe: 2,
        },
        ..IndexConfig::with_dimensions(8)
    };
    let records = synthetic_records(200, 8);
    let index = InMemoryVectorIndex::new(&config);
    index.build(records.clone()).await.unwrap();
    assert_eq!(index.stats().kind.as_str(), "ivf");

    for rec in records.iter().step_by(20) {
        let results = index.search(&rec.embedding, 5).await.unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].item_id, rec.id);
    }
}

#[tokio::test]
async fn test_ivf_fills_k_beyond_nprobe() {
    let config = IndexConfig {
        kind: IndexKind::Ivf {
            nlist: 16,
            nprobe: 1,
        },
        ..IndexConfig::with_dimensions(4)
    };
    let index = InMemoryVectorIndex::new(&config);
    index.build(synthetic_records(64, 4)).await.unwrap();
    let results = index.search(&emb(&[1.0, 1.0, 1.0, 1.0]), 40).await.unwrap();
    assert_eq!(results.len(), 40);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_persist_and_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("index").join("items.snap");

    let index = abc_index().await;
    index.add(ItemId(4), emb(&[-1.0, 0.0])).await.unwrap();
    index.persist(&path).await.unwrap();

    let loaded = InMemoryVectorIndex::open(&IndexConfig::with_dimensions(2), &path)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 4);
    let results = loaded.search(&emb(&[1.0, 0.0]), 2).await.unwrap();
    let ids: Vec<ItemId> = results.iter().map(|n| n.item_id).collect();
    assert_eq!(ids, vec![ItemId(1), ItemId(3)]);
}

#[tokio::test]
async fn test_load_truncated_file_is_corrupt() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("items.snap");
    abc_index().await.persist(&path).await.unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

    let index = InMemoryVectorIndex::with_dimensions(2);
    let err = index.load(&path).await.unwrap_err();
    assert!(matches!(err, Error::IndexCorrupt { .. }));
    assert!(err.is_integrity());
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_load_garbage_is_corrupt() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("items.snap");
    std::fs::write(&path, b"not an index").unwrap();

    let index = InMemoryVectorIndex::with_dimensions(2);
    assert!(matches!(
        index.load(&path).await,
        Err(Error::IndexCorrupt { .. })
    ));
}

#[tokio::test]
async fn test_load_rejects_overflowing_header_dimensions() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("items.snap");
    let header = br#"{"format_version":1,"kind":"flat","dimensions":4611686018427387904,"count":0,"created_at":"2026-01-01T00:00:00Z"}"#;
    let mut bytes = (header.len() as u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(header);
    std::fs::write(&path, bytes).unwrap();

    let index = InMemoryVectorIndex::with_dimensions(2);
    let err = index.load(&path).await.unwrap_err();
    assert!(matches!(err, Error::IndexCorrupt { .. }), "{err:?}");
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_load_with_other_dimension_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("items.snap");
    abc_index().await.persist(&path).await.unwrap();

    let index = InMemoryVectorIndex::with_dimensions(3);
    assert!(matches!(
        index.load(&path).await,
        Err(Error::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn test_load_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let index = InMemoryVectorIndex::with_dimensions(2);
    let err = index
        .load(&temp.path().join("missing.snap"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

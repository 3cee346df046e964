//! Composition root tests

use std::sync::Arc;

use recs_application::{
    FeedbackServiceInterface, FilteredSearchInterface, RecommendRequest,
    RecommendationServiceInterface,
};
use recs_domain::error::Error;
use recs_domain::ports::providers::VectorIndexProvider;
use recs_domain::value_objects::{
    CacheConfig, CacheProviderKind, CategoryId, Embedding, EstimatorKind, IndexConfig,
    InteractionEvent, InteractionType, ItemAttributes, ItemId, ItemRecord, RecommendConfig,
    SearchConfig, SearchFilters, UserId,
};
use recs_infrastructure::config::{AppConfig, ConfigBuilder};
use recs_infrastructure::di::EngineContext;
use recs_providers::InMemoryCatalog;
use tempfile::TempDir;

const DIMS: usize = 4;

fn vector_for(id: u64) -> Embedding {
    let mut state = id.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ 0xD1B5_4A32_D192_ED03;
    let values: Vec<f32> = (0..DIMS)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            ((state % 10_000) as f32 / 5_000.0) - 1.0 + 1e-4
        })
        .collect();
    Embedding::normalized(values).unwrap()
}

fn records(n: u64) -> Vec<ItemRecord> {
    (1..=n)
        .map(|id| ItemRecord::new(ItemId(id), vector_for(id)))
        .collect()
}

fn catalog(n: u64) -> Arc<InMemoryCatalog> {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.upsert_items((1..=n).map(|id| {
        (
            ItemId(id),
            ItemAttributes::default()
                .with_price(id as f64)
                .with_stock(if id % 2 == 0 { 5 } else { 0 })
                .with_category(CategoryId(id % 5)),
        )
    }));
    catalog
}

fn small_config() -> AppConfig {
    ConfigBuilder::new()
        .with_dimensions(DIMS)
        .with_recommend(RecommendConfig {
            latency_budget_ms: 5_000,
            ..RecommendConfig::default()
        })
        .build()
}

#[tokio::test]
async fn test_engine_serves_personalized_recommendations() {
    let context = EngineContext::from_config(small_config(), catalog(30))
        .await
        .unwrap();
    assert_eq!(context.index_items(records(30)).await.unwrap(), 30);
    assert!(context.contains_item(ItemId(17)));

    let user = UserId(1);
    context
        .feedback()
        .apply(&InteractionEvent::new(user, ItemId(17), InteractionType::Like))
        .await
        .unwrap();
    context.feedback().flush().await.unwrap();

    let recs = context
        .recommendations()
        .recommend(RecommendRequest::new(5).for_user(user))
        .await
        .unwrap();

    assert!(recs.personalized);
    assert!(!recs.degraded);
    assert_eq!(recs.results[0].item_id, ItemId(17));
    assert!(context.cache().get_long_term(user).await.unwrap().is_some());
}

#[tokio::test]
async fn test_snapshot_written_on_shutdown_and_reloaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state").join("index.snap");
    let mut config = small_config();
    config.index = IndexConfig {
        snapshot_path: Some(path.clone()),
        ..IndexConfig::with_dimensions(DIMS)
    };

    let first = EngineContext::from_config(config.clone(), catalog(20))
        .await
        .unwrap();
    assert!(first.index().is_empty());
    first.index_items(records(20)).await.unwrap();
    first.shutdown().await.unwrap();
    assert!(path.exists());

    let second = EngineContext::from_config(config, catalog(20))
        .await
        .unwrap();
    assert_eq!(second.index().len(), 20);

    let results = second
        .search()
        .search(&vector_for(5), 3, &SearchFilters::default(), None)
        .await
        .unwrap();
    assert_eq!(results.hits[0].item_id, ItemId(5));
}

#[tokio::test]
async fn test_corrupt_snapshot_fails_startup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.snap");
    std::fs::write(&path, b"x").unwrap();

    let mut config = small_config();
    config.index.snapshot_path = Some(path);

    let error = EngineContext::from_config(config, catalog(1))
        .await
        .unwrap_err();
    assert!(matches!(error, Error::IndexCorrupt { .. }));
    assert!(error.is_integrity());
}

#[tokio::test]
async fn test_invalid_configuration_rejected() {
    let config = ConfigBuilder::new().with_dimensions(0).build();

    let result = EngineContext::from_config(config, catalog(1)).await;
    assert!(matches!(result, Err(Error::Configuration { .. })));
}

#[tokio::test]
async fn test_null_cache_with_sampling_estimator() {
    let config = ConfigBuilder::new()
        .with_dimensions(DIMS)
        .with_cache(CacheConfig {
            provider: CacheProviderKind::Null,
            ..CacheConfig::default()
        })
        .with_search(SearchConfig {
            estimator: EstimatorKind::Sampling,
            sample_size: 50,
            ..SearchConfig::default()
        })
        .with_recommend(RecommendConfig {
            latency_budget_ms: 5_000,
            ..RecommendConfig::default()
        })
        .build();
    let context = EngineContext::from_config(config, catalog(40)).await.unwrap();
    context.index_items(records(40)).await.unwrap();

    let results = context
        .search()
        .search(&vector_for(3), 5, &SearchFilters::default().in_stock(), None)
        .await
        .unwrap();
    assert_eq!(results.total_found, 5);
    assert!(results.hits.iter().all(|h| h.item_id.get() % 2 == 0));

    let request = RecommendRequest::new(5).with_query(vector_for(3));
    let first = context
        .recommendations()
        .recommend(request.clone())
        .await
        .unwrap();
    let second = context.recommendations().recommend(request).await.unwrap();
    assert!(!first.from_cache);
    assert!(!second.from_cache);
    assert_eq!(first.results[0].item_id, ItemId(3));
}

#[tokio::test]
async fn test_upsert_item_is_searchable() {
    let context = EngineContext::from_config(small_config(), catalog(10))
        .await
        .unwrap();
    context.index_items(records(10)).await.unwrap();

    let vector = vector_for(99);
    context
        .upsert_item(ItemRecord::new(ItemId(99), vector.clone()))
        .await
        .unwrap();

    assert!(context.contains_item(ItemId(99)));
    let cached = context
        .cache()
        .get_product_embedding(ItemId(99))
        .await
        .unwrap();
    assert!(cached.is_some());

    let results = context
        .search()
        .search(&vector, 1, &SearchFilters::default(), None)
        .await
        .unwrap();
    assert_eq!(results.hits[0].item_id, ItemId(99));
}

#[tokio::test]
async fn test_upsert_rejects_wrong_dimension() {
    let context = EngineContext::from_config(small_config(), catalog(1))
        .await
        .unwrap();
    let wide = Embedding::normalized(vec![1.0; DIMS + 2]).unwrap();

    let result = context.upsert_item(ItemRecord::new(ItemId(1), wide)).await;
    assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
}

#[tokio::test]
async fn test_shutdown_stops_worker() {
    let context = EngineContext::from_config(small_config(), catalog(1))
        .await
        .unwrap();
    assert!(context.worker_running());
    assert!(format!("{context:?}").contains("EngineContext"));

    context.shutdown().await.unwrap();

    assert!(!context.worker_running());
    assert!(format!("{context:?}").contains("worker_running: false"));
}

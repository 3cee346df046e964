//! Tests for the in-memory catalog and selectivity estimators

use std::sync::Arc;

use chrono::{Duration, Utc};
use recs_domain::Error;
use recs_domain::ports::providers::{CatalogProvider, SelectivityEstimator};
use recs_domain::value_objects::{
    BrandId, InteractionType, ItemAttributes, ItemId, MerchantId, SearchFilters, UserId,
};
use recs_providers::{ExactCountEstimator, InMemoryCatalog, SamplingEstimator};

/// Ten items priced 10..=100; even ids in stock, brand = id % 3
fn catalog() -> Arc<InMemoryCatalog> {
    let catalog = InMemoryCatalog::new();
    catalog.upsert_items((1..=10u64).map(|id| {
        let attributes = ItemAttributes::default()
            .with_price(id as f64 * 10.0)
            .with_stock(if id % 2 == 0 { 5 } else { 0 })
            .with_merchant(MerchantId(1))
            .with_brand(BrandId(id % 3));
        (ItemId(id), attributes)
    }));
    Arc::new(catalog)
}

#[tokio::test]
async fn test_matching_ids_and_count() {
    let catalog = catalog();
    let filters = SearchFilters::default()
        .with_price_range(Some(30.0), Some(60.0))
        .in_stock();

    let ids = catalog.matching_item_ids(&filters).await.unwrap();
    let mut ids: Vec<u64> = ids.into_iter().map(|id| id.get()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![4, 6]);
    assert_eq!(catalog.count_matching(&filters).await.unwrap(), 2);
    assert_eq!(catalog.catalog_size().await.unwrap(), 10);
}

#[tokio::test]
async fn test_item_attributes_skips_unknown() {
    let catalog = catalog();
    let attrs = catalog
        .item_attributes(&[ItemId(1), ItemId(99)])
        .await
        .unwrap();
    assert_eq!(attrs.len(), 1);
    assert_eq!(attrs[&ItemId(1)].price, Some(10.0));
}

#[tokio::test]
async fn test_sample_is_bounded_by_catalog() {
    let catalog = catalog();
    assert_eq!(catalog.sample_item_ids(4).await.unwrap().len(), 4);
    assert_eq!(catalog.sample_item_ids(50).await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_offline_catalog_fails_with_unavailable() {
    let catalog = catalog();
    catalog.set_offline(true);
    let err = catalog.catalog_size().await.unwrap_err();
    assert!(matches!(err, Error::CatalogUnavailable { .. }));
    assert!(err.is_degradation());
    assert!(
        catalog
            .matching_item_ids(&SearchFilters::default())
            .await
            .is_err()
    );

    catalog.set_offline(false);
    assert_eq!(catalog.catalog_size().await.unwrap(), 10);
}

#[tokio::test]
async fn test_record_interaction_updates_aggregates() {
    let catalog = catalog();
    let user = UserId(7);
    let earlier = Utc::now() - Duration::days(2);
    let later = Utc::now();

    catalog.record_interaction(user, ItemId(2), InteractionType::View, later);
    catalog.record_interaction(user, ItemId(2), InteractionType::Purchase, earlier);
    catalog.record_interaction(user, ItemId(4), InteractionType::Dislike, later);

    let stats = catalog.popularity_stats(&[ItemId(2)]).await.unwrap();
    let item = &stats[&ItemId(2)];
    assert_eq!(item.views, 1);
    assert_eq!(item.purchases, 1);
    assert_eq!(item.last_interaction, Some(later));

    assert_eq!(catalog.user_purchase_prices(user).await.unwrap(), vec![20.0]);

    let brands = catalog.user_brand_interactions(user).await.unwrap();
    assert_eq!(brands.len(), 3);
    assert!(brands.contains(&(BrandId(1), -1.0)));
    assert!(catalog.user_purchase_prices(UserId(8)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exact_estimator() {
    let catalog = catalog();
    let estimator = ExactCountEstimator::new(catalog.clone());

    let in_stock = SearchFilters::default().in_stock();
    assert!((estimator.estimate(&in_stock).await.unwrap() - 0.5).abs() < 1e-9);
    assert_eq!(
        estimator.estimate(&SearchFilters::default()).await.unwrap(),
        1.0
    );
    assert_eq!(estimator.name(), "exact");

    let empty = ExactCountEstimator::new(Arc::new(InMemoryCatalog::new()));
    assert_eq!(empty.estimate(&in_stock).await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_sampling_estimator_with_full_sample_is_exact() {
    let catalog = catalog();
    let estimator = SamplingEstimator::new(catalog.clone(), 1000);
    let filters = SearchFilters::default().with_price_range(None, Some(30.0));
    assert!((estimator.estimate(&filters).await.unwrap() - 0.3).abs() < 1e-9);
    assert_eq!(estimator.name(), "sampling");
}

#[tokio::test]
async fn test_estimator_propagates_outage() {
    let catalog = catalog();
    let estimator = ExactCountEstimator::new(catalog.clone());
    catalog.set_offline(true);
    assert!(
        estimator
            .estimate(&SearchFilters::default().in_stock())
            .await
            .is_err()
    );
}

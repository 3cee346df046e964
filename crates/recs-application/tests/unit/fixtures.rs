//! Shared test fixtures: a small catalog wired to real in-memory providers

use std::sync::Arc;

use recs_application::{EmbeddingCache, FilteredSearchService};
use recs_domain::ports::providers::{CacheProvider, VectorIndexProvider};
use recs_domain::value_objects::{
    BrandId, CacheConfig, CategoryId, Embedding, ItemAttributes, ItemId, ItemRecord,
    MerchantId, SearchConfig,
};
use recs_providers::{ExactCountEstimator, InMemoryCatalog, InMemoryVectorIndex, MokaCacheProvider};

pub const DIMS: usize = 4;

pub fn emb(values: &[f32]) -> Embedding {
    Embedding::normalized(values.to_vec()).unwrap()
}

/// Deterministic pseudo-random vector for an id
pub fn vector_for(id: u64) -> Embedding {
    let mut state = id.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ 0xD1B5_4A32_D192_ED03;
    let values: Vec<f32> = (0..DIMS)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            ((state % 10_000) as f32 / 5_000.0) - 1.0 + 1e-4
        })
        .collect();
    emb(&values)
}

/// Attributes for catalog item `id`: price = id, even ids in stock,
/// category = id % 10, brand = id % 4, merchant = id % 3
pub fn attributes_for(id: u64) -> ItemAttributes {
    ItemAttributes::default()
        .with_price(id as f64)
        .with_stock(if id % 2 == 0 { 10 } else { 0 })
        .with_category(CategoryId(id % 10))
        .with_brand(BrandId(id % 4))
        .with_merchant(MerchantId(id % 3))
}

pub fn moka_cache() -> Arc<EmbeddingCache> {
    let provider: Arc<dyn CacheProvider> = Arc::new(MokaCacheProvider::new());
    Arc::new(EmbeddingCache::new(provider, DIMS, &CacheConfig::default()))
}

pub struct Fixture {
    pub index: Arc<InMemoryVectorIndex>,
    pub catalog: Arc<InMemoryCatalog>,
    pub cache: Arc<EmbeddingCache>,
    pub search: Arc<FilteredSearchService>,
}

/// Catalog of items `1..=n` indexed and described in the catalog
pub async fn fixture(n: u64) -> Fixture {
    let records: Vec<ItemRecord> = (1..=n)
        .map(|id| ItemRecord::new(ItemId(id), vector_for(id)))
        .collect();
    fixture_with(records, |id| attributes_for(id.get())).await
}

pub async fn fixture_with<F>(records: Vec<ItemRecord>, attributes: F) -> Fixture
where
    F: Fn(ItemId) -> ItemAttributes,
{
    let index = Arc::new(InMemoryVectorIndex::with_dimensions(DIMS));
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.upsert_items(records.iter().map(|r| (r.id, attributes(r.id))));
    index.build(records).await.unwrap();

    let cache = moka_cache();
    let search = Arc::new(FilteredSearchService::new(
        index.clone(),
        catalog.clone(),
        Arc::new(ExactCountEstimator::new(catalog.clone())),
        cache.clone(),
        SearchConfig::default(),
    ));
    Fixture {
        index,
        catalog,
        cache,
        search,
    }
}

pub fn is_unit(e: &Embedding) -> bool {
    let norm: f32 = e.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
    (norm - 1.0).abs() < 1e-5
}

/// Component-wise equality within float tolerance
pub fn assert_close(a: &Embedding, b: &Embedding) {
    assert_eq!(a.dimensions(), b.dimensions());
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
    }
}

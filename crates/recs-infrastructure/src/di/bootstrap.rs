//! Engine Bootstrap - Composition Root
//!
//! Builds every provider and service from an [`AppConfig`] and hands them
//! out as shared `Arc`s. Nothing in the engine is a global: two contexts
//! built from two configurations are fully independent.
//!
//! ```text
//! AppConfig ──► cache provider ──► EmbeddingCache ─┬─► FilteredSearchService ──► RecommendationService
//!           ├─► vector index (snapshot or empty) ──┤
//!           ├─► selectivity estimator ─────────────┘
//!           └─► LongTermUpdateQueue + worker ──► FeedbackUpdater
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let context = EngineContext::from_config(config, catalog).await?;
//! context.index_items(records).await?;
//!
//! let recs = context.recommendations().recommend(request).await?;
//! context.feedback().apply(&event).await?;
//!
//! context.shutdown().await?;
//! ```

use std::sync::{Arc, Mutex};
use std::time::Instant;

use recs_application::{
    EmbeddingCache, FeedbackServiceInterface, FeedbackUpdater, FilteredSearchInterface,
    FilteredSearchService, LongTermUpdateQueue, PersonalizationBlender, Ranker,
    RecommendationService, RecommendationServiceInterface, SignalCollector,
};
use recs_domain::error::Result;
use recs_domain::ports::providers::{
    CacheProvider, CatalogProvider, SelectivityEstimator, VectorIndexProvider,
};
use recs_domain::value_objects::{
    CacheConfig, CacheProviderKind, EstimatorKind, IndexConfig, ItemId, ItemRecord, SearchConfig,
};
use recs_providers::{
    ExactCountEstimator, InMemoryVectorIndex, MokaCacheProvider, NullCacheProvider,
    SamplingEstimator,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{AppConfig, validate_app_config};
use crate::error_ext::ErrorContext;

/// Engine context holding every wired component
pub struct EngineContext {
    /// Engine configuration
    pub config: Arc<AppConfig>,

    // ========================================================================
    // Providers
    // ========================================================================
    index: Arc<dyn VectorIndexProvider>,
    catalog: Arc<dyn CatalogProvider>,
    cache: Arc<EmbeddingCache>,

    // ========================================================================
    // Services
    // ========================================================================
    search: Arc<FilteredSearchService>,
    feedback: Arc<FeedbackUpdater>,
    recommendations: Arc<RecommendationService>,

    // ========================================================================
    // Background tasks
    // ========================================================================
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EngineContext {
    /// Build an engine from configuration and an external catalog
    pub async fn from_config(
        config: AppConfig,
        catalog: Arc<dyn CatalogProvider>,
    ) -> Result<Self> {
        init_engine(config, catalog).await
    }

    // ========================================================================
    // Providers
    // ========================================================================

    /// Get the vector index
    pub fn index(&self) -> Arc<dyn VectorIndexProvider> {
        self.index.clone()
    }

    /// Get the catalog
    pub fn catalog(&self) -> Arc<dyn CatalogProvider> {
        self.catalog.clone()
    }

    /// Get the embedding cache
    pub fn cache(&self) -> Arc<EmbeddingCache> {
        self.cache.clone()
    }

    // ========================================================================
    // Services
    // ========================================================================

    /// Get the filtered search service
    pub fn search(&self) -> Arc<dyn FilteredSearchInterface> {
        self.search.clone()
    }

    /// Get the feedback service
    pub fn feedback(&self) -> Arc<dyn FeedbackServiceInterface> {
        self.feedback.clone()
    }

    /// Get the recommendation service
    pub fn recommendations(&self) -> Arc<dyn RecommendationServiceInterface> {
        self.recommendations.clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Replace the index contents with `records`
    ///
    /// Cached product vectors of the indexed items are overwritten so reads
    /// never see a vector from before the rebuild.
    pub async fn index_items(&self, records: Vec<ItemRecord>) -> Result<usize> {
        let started = Instant::now();
        let vectors: Vec<_> = records
            .iter()
            .map(|record| (record.id, record.embedding.clone()))
            .collect();

        self.index.build(records).await?;
        if let Err(e) = self.cache.set_product_embeddings(&vectors).await {
            warn!(error = %e, "failed to refresh cached product vectors after rebuild");
        }

        info!(
            items = vectors.len(),
            elapsed_ms = elapsed_ms(started),
            "vector index rebuilt"
        );
        Ok(vectors.len())
    }

    /// Add or replace one item without a full rebuild
    pub async fn upsert_item(&self, record: ItemRecord) -> Result<()> {
        let ItemRecord { id, embedding, .. } = record;
        self.index.add(id, embedding.clone()).await?;
        if let Err(e) = self.cache.set_product_embedding(id, &embedding).await {
            warn!(item_id = %id, error = %e, "failed to refresh cached product vector");
        }
        Ok(())
    }

    /// Whether an item is searchable
    pub fn contains_item(&self, item_id: ItemId) -> bool {
        self.index.contains(item_id)
    }

    /// Whether the long-term worker is still running
    pub fn worker_running(&self) -> bool {
        self.worker
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Drain pending long-term updates and persist the index
    ///
    /// The snapshot is written only when `index.snapshot_path` is set.
    pub async fn shutdown(&self) -> Result<()> {
        let started = Instant::now();
        self.feedback.flush().await?;
        if let Ok(mut guard) = self.worker.lock()
            && let Some(handle) = guard.take()
        {
            handle.abort();
        }

        if let Some(path) = &self.config.index.snapshot_path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .io_context(format!("Failed to create {}", parent.display()))?;
            }
            self.index.persist(path).await?;
        }

        info!(elapsed_ms = elapsed_ms(started), "engine shut down");
        Ok(())
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("index", &self.index.provider_name())
            .field("items", &self.index.len())
            .field("cache", &self.cache.provider().provider_name())
            .field("catalog", &self.catalog.provider_name())
            .field("worker_running", &self.worker_running())
            .finish_non_exhaustive()
    }
}

/// Initialize the engine context
///
/// Validates the configuration, builds the providers, loads the index
/// snapshot when one is configured and present, wires the services and
/// spawns the long-term update worker.
pub async fn init_engine(
    config: AppConfig,
    catalog: Arc<dyn CatalogProvider>,
) -> Result<EngineContext> {
    validate_app_config(&config)?;
    info!(
        dimensions = config.index.dimensions,
        index = config.index.kind.as_str(),
        "initializing engine"
    );

    let cache_provider = create_cache_provider(&config.cache);
    info!(provider = cache_provider.provider_name(), "cache provider ready");
    let cache = Arc::new(EmbeddingCache::new(
        cache_provider,
        config.index.dimensions,
        &config.cache,
    ));

    let index = open_vector_index(&config.index).await?;
    info!(items = index.len(), "vector index ready");

    let estimator = create_estimator(&config.search, catalog.clone());
    info!(estimator = estimator.name(), "selectivity estimator ready");

    let search = Arc::new(FilteredSearchService::new(
        index.clone(),
        catalog.clone(),
        estimator,
        cache.clone(),
        config.search.clone(),
    ));

    let (queue, worker) = LongTermUpdateQueue::spawn(cache.clone(), &config.feedback);
    let feedback = Arc::new(FeedbackUpdater::new(
        cache.clone(),
        index.clone(),
        queue,
        &config.feedback,
    ));

    let signals = Arc::new(SignalCollector::new(
        catalog.clone(),
        cache.clone(),
        &config.ranking,
    ));
    let recommendations = Arc::new(RecommendationService::new(
        cache.clone(),
        search.clone(),
        signals,
        PersonalizationBlender::new(config.personalization.clone()),
        Ranker::from_config(&config.ranking),
        config.recommend.clone(),
    ));

    Ok(EngineContext {
        config: Arc::new(config),
        index,
        catalog,
        cache,
        search,
        feedback,
        recommendations,
        worker: Mutex::new(Some(worker)),
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Cache backend selected by configuration
pub fn create_cache_provider(config: &CacheConfig) -> Arc<dyn CacheProvider> {
    match config.provider {
        CacheProviderKind::Moka => Arc::new(MokaCacheProvider::with_capacity(config.max_entries)),
        CacheProviderKind::Null => Arc::new(NullCacheProvider::new()),
    }
}

/// Selectivity estimator selected by configuration
pub fn create_estimator(
    config: &SearchConfig,
    catalog: Arc<dyn CatalogProvider>,
) -> Arc<dyn SelectivityEstimator> {
    match config.estimator {
        EstimatorKind::Exact => Arc::new(ExactCountEstimator::new(catalog)),
        EstimatorKind::Sampling => Arc::new(SamplingEstimator::new(catalog, config.sample_size)),
    }
}

/// Index loaded from the configured snapshot, or empty
///
/// A missing snapshot file starts an empty index; a corrupt one fails
/// startup with [`recs_domain::error::Error::IndexCorrupt`].
pub async fn open_vector_index(config: &IndexConfig) -> Result<Arc<dyn VectorIndexProvider>> {
    let Some(path) = &config.snapshot_path else {
        return Ok(Arc::new(InMemoryVectorIndex::new(config)));
    };

    let exists = tokio::fs::try_exists(path)
        .await
        .io_context(format!("Failed to check snapshot {}", path.display()))?;
    if exists {
        let index = InMemoryVectorIndex::open(config, path).await?;
        Ok(Arc::new(index))
    } else {
        info!(path = %path.display(), "no index snapshot found, starting empty");
        Ok(Arc::new(InMemoryVectorIndex::new(config)))
    }
}

//! Recommendation Use Case
//!
//! End-to-end retrieval path: user vectors → blend → filtered search →
//! re-rank, bounded by the latency budget.
//!
//! When there is nothing to personalize with and no explicit query, the
//! service falls back to the most viewed items. A request that runs past
//! the budget is abandoned and answered with an empty, degraded result.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use recs_domain::constants::SEARCH_OVERFETCH_FACTOR;
use recs_domain::error::Result;
use recs_domain::value_objects::{
    Embedding, ItemId, Neighbor, RankedResult, RecommendConfig, RequestContext, SearchFilters,
    SearchResults, SearchStrategy, UserId, UserVectors,
};
use serde::{Deserialize, Serialize};

use super::embedding_cache::{CachedRanking, EmbeddingCache};
use super::signal_collector::SignalCollector;
use crate::domain_services::personalization::{BlendOutcome, PersonalizationBlender};
use crate::domain_services::ranking::Ranker;
use crate::ports::services::{FilteredSearchInterface, RecommendationServiceInterface};

/// A recommendation request as handed over by the outer layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendRequest {
    /// Requesting user; `None` for anonymous traffic
    pub user_id: Option<UserId>,
    /// Result count; `None` uses the configured default
    pub k: Option<usize>,
    /// Where the request originates
    pub context: RequestContext,
    /// Attribute filters
    pub filters: SearchFilters,
    /// Explicit query vector (search context)
    pub query: Option<Embedding>,
    /// Forced search strategy
    pub strategy: Option<SearchStrategy>,
    /// Whether to re-rank; `None` uses the configured default
    pub use_ranking: Option<bool>,
}

impl RecommendRequest {
    /// Request for `k` results in the feed context
    pub fn new(k: usize) -> Self {
        Self {
            k: Some(k),
            ..Self::default()
        }
    }

    /// Set the requesting user
    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the request context
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Set the attribute filters
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Set an explicit query vector
    pub fn with_query(mut self, query: Embedding) -> Self {
        self.query = Some(query);
        self
    }

    /// Force a search strategy
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Turn re-ranking on or off
    pub fn with_ranking(mut self, use_ranking: bool) -> Self {
        self.use_ranking = Some(use_ranking);
        self
    }

    /// Stable key identifying the request's parameters (not the user)
    pub fn cache_key(&self, k: usize, use_ranking: bool) -> String {
        let mut hasher = DefaultHasher::new();
        k.hash(&mut hasher);
        use_ranking.hash(&mut hasher);
        self.context.hash(&mut hasher);
        self.strategy.hash(&mut hasher);
        serde_json::to_string(&self.filters)
            .unwrap_or_default()
            .hash(&mut hasher);
        if let Some(query) = &self.query {
            for value in query.as_slice() {
                value.to_bits().hash(&mut hasher);
            }
        }
        format!("{}:{:016x}", self.context, hasher.finish())
    }
}

/// Ranked results with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    /// Ranked results, best first
    pub results: Vec<RankedResult>,
    /// Strategy the search used
    pub strategy: SearchStrategy,
    /// Whether the query vector came from the user's profile
    pub personalized: bool,
    /// Set when a dependency failed or the budget ran out
    pub degraded: bool,
    /// Served from the per-user result cache
    pub from_cache: bool,
    /// Wall time spent
    pub elapsed: Duration,
}

impl Recommendations {
    fn empty(strategy: SearchStrategy) -> Self {
        Self {
            results: Vec::new(),
            strategy,
            personalized: false,
            degraded: false,
            from_cache: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Whether nothing is recommended
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Item ids in result order
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.results.iter().map(|r| r.item_id).collect()
    }
}

/// Recommendation service
pub struct RecommendationService {
    cache: Arc<EmbeddingCache>,
    search: Arc<dyn FilteredSearchInterface>,
    signals: Arc<SignalCollector>,
    blender: PersonalizationBlender,
    ranker: Ranker,
    config: RecommendConfig,
}

impl RecommendationService {
    /// Create the service with injected dependencies
    pub fn new(
        cache: Arc<EmbeddingCache>,
        search: Arc<dyn FilteredSearchInterface>,
        signals: Arc<SignalCollector>,
        blender: PersonalizationBlender,
        ranker: Ranker,
        config: RecommendConfig,
    ) -> Self {
        Self {
            cache,
            search,
            signals,
            blender,
            ranker,
            config,
        }
    }

    /// Stored vectors of a user; unavailable cache reads as anonymous
    async fn user_vectors(&self, user_id: Option<UserId>) -> Result<UserVectors> {
        let Some(user_id) = user_id else {
            return Ok(UserVectors::anonymous());
        };
        match self.cache.user_vectors(user_id).await {
            Ok(vectors) => Ok(vectors),
            Err(e) if e.is_integrity() => Err(e),
            Err(e) => {
                tracing::warn!(user_id = user_id.get(), error = %e, "user vectors unavailable");
                Ok(UserVectors::anonymous())
            }
        }
    }

    /// Result generation of a user; `None` disables the result cache for
    /// this request
    async fn cached_generation(&self, user_id: UserId) -> Option<i64> {
        match self.cache.results_generation(user_id).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(user_id = user_id.get(), error = %e, "result generation unavailable");
                None
            }
        }
    }

    async fn rank(
        &self,
        user_id: Option<UserId>,
        results: &SearchResults,
        use_ranking: bool,
    ) -> (Vec<RankedResult>, bool) {
        if !use_ranking {
            return (Ranker::passthrough(results), false);
        }
        let signals = self.signals.collect(user_id, &results.item_ids()).await;
        (self.ranker.rank(results, &signals), signals.degraded)
    }

    /// Most viewed items matching `filters`, ranked without similarity
    async fn popular(
        &self,
        user_id: Option<UserId>,
        k: usize,
        filters: &SearchFilters,
        use_ranking: bool,
    ) -> Result<Recommendations> {
        let hot = match self
            .cache
            .hot_items(k.saturating_mul(SEARCH_OVERFETCH_FACTOR))
            .await
        {
            Ok(hot) => hot,
            Err(e) => {
                tracing::warn!(error = %e, "hot items unavailable");
                let mut empty = Recommendations::empty(SearchStrategy::Unfiltered);
                empty.degraded = true;
                return Ok(empty);
            }
        };
        let ids: Vec<ItemId> = hot.into_iter().map(|(id, _)| id).collect();
        let (ids, filter_degraded) = self.search.retain_matching(ids, filters).await?;

        // no query vector: every candidate sits at maximal distance
        let neighbors: Vec<Neighbor> = ids.into_iter().map(|id| Neighbor::new(id, 2.0)).collect();
        let results =
            SearchResults::from_neighbors(neighbors, k, SearchStrategy::Unfiltered, Duration::ZERO);
        let (ranked, rank_degraded) = self.rank(user_id, &results, use_ranking).await;
        Ok(Recommendations {
            results: ranked,
            strategy: SearchStrategy::Unfiltered,
            personalized: false,
            degraded: filter_degraded || rank_degraded,
            from_cache: false,
            elapsed: Duration::ZERO,
        })
    }

    async fn recommend_within_budget(&self, request: &RecommendRequest) -> Result<Recommendations> {
        let k = request.k.unwrap_or(self.config.default_k);
        let use_ranking = request.use_ranking.unwrap_or(self.config.use_ranking);
        if k == 0 {
            return Ok(Recommendations::empty(SearchStrategy::Unfiltered));
        }

        let request_key = request.cache_key(k, use_ranking);
        let generation = match request.user_id {
            Some(user_id) => self.cached_generation(user_id).await,
            None => None,
        };
        if let (Some(user_id), Some(generation)) = (request.user_id, generation) {
            match self
                .cache
                .cached_ranked_results(user_id, generation, &request_key)
                .await
            {
                Ok(Some(ranking)) => {
                    let mut cached = Recommendations::empty(ranking.strategy);
                    cached.results = ranking.results;
                    cached.personalized = true;
                    cached.from_cache = true;
                    return Ok(cached);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(user_id = user_id.get(), error = %e, "result cache read failed"),
            }
        }

        let user = self.user_vectors(request.user_id).await?;
        let outcome = self
            .blender
            .blend(&user, request.query.as_ref(), request.context)?;
        let personalized = outcome.is_personalized();
        let query = match outcome {
            BlendOutcome::Blended(query) => query,
            BlendOutcome::NoPersonalization => match &request.query {
                Some(query) => query.clone(),
                None => {
                    tracing::debug!(
                        user_id = request.user_id.map(UserId::get),
                        "no personalization available, serving popular items"
                    );
                    return self
                        .popular(request.user_id, k, &request.filters, use_ranking)
                        .await;
                }
            },
        };

        let results = self
            .search
            .search(&query, k, &request.filters, request.strategy)
            .await?;
        let (ranked, rank_degraded) = self.rank(request.user_id, &results, use_ranking).await;
        let recommendations = Recommendations {
            results: ranked,
            strategy: results.strategy,
            personalized,
            degraded: results.degraded || rank_degraded,
            from_cache: false,
            elapsed: Duration::ZERO,
        };

        if let (Some(user_id), Some(generation)) = (request.user_id, generation)
            && personalized
            && !recommendations.degraded
        {
            let ranking = CachedRanking {
                strategy: recommendations.strategy,
                results: recommendations.results.clone(),
            };
            if let Err(e) = self
                .cache
                .cache_ranked_results(user_id, generation, &request_key, &ranking)
                .await
            {
                tracing::warn!(user_id = user_id.get(), error = %e, "result cache write failed");
            }
        }
        Ok(recommendations)
    }

    async fn similar_within_budget(
        &self,
        item_id: ItemId,
        user_id: Option<UserId>,
        k: usize,
        blend_ratio: Option<f32>,
        filters: &SearchFilters,
    ) -> Result<Recommendations> {
        if k == 0 {
            return Ok(Recommendations::empty(SearchStrategy::Unfiltered));
        }
        let Some(item_vector) = self.search.item_vector(item_id).await? else {
            return Ok(Recommendations::empty(SearchStrategy::Unfiltered));
        };
        let user = self.user_vectors(user_id).await?;
        let personalized = !user.is_anonymous();
        let ratio = blend_ratio.unwrap_or_else(|| self.blender.item_blend_ratio());
        let query = self.blender.blend_item_and_user(&item_vector, &user, ratio)?;

        let results = self
            .search
            .search(&query, k.saturating_add(1), filters, None)
            .await?;
        let neighbors: Vec<Neighbor> = results
            .hits
            .iter()
            .filter(|h| h.item_id != item_id)
            .map(|h| Neighbor::new(h.item_id, h.distance))
            .collect();
        let mut trimmed = SearchResults::from_neighbors(neighbors, k, results.strategy, results.elapsed);
        trimmed.degraded = results.degraded;

        let use_ranking = self.config.use_ranking;
        let (ranked, rank_degraded) = self.rank(user_id, &trimmed, use_ranking).await;
        Ok(Recommendations {
            results: ranked,
            strategy: trimmed.strategy,
            personalized,
            degraded: trimmed.degraded || rank_degraded,
            from_cache: false,
            elapsed: Duration::ZERO,
        })
    }

    /// Run `work` within the latency budget
    async fn budgeted<F>(&self, operation: &'static str, work: F) -> Result<Recommendations>
    where
        F: std::future::Future<Output = Result<Recommendations>> + Send,
    {
        let started = Instant::now();
        let budget = self.config.latency_budget();
        match tokio::time::timeout(budget, work).await {
            Ok(Ok(mut recommendations)) => {
                recommendations.elapsed = started.elapsed();
                tracing::debug!(
                    operation,
                    results = recommendations.results.len(),
                    personalized = recommendations.personalized,
                    degraded = recommendations.degraded,
                    from_cache = recommendations.from_cache,
                    elapsed_ms = recommendations.elapsed.as_millis() as u64,
                    "recommendation served"
                );
                Ok(recommendations)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(
                    operation,
                    budget_ms = budget.as_millis() as u64,
                    "latency budget exceeded, request abandoned"
                );
                let mut empty = Recommendations::empty(SearchStrategy::Unfiltered);
                empty.degraded = true;
                empty.elapsed = started.elapsed();
                Ok(empty)
            }
        }
    }
}

#[async_trait]
impl RecommendationServiceInterface for RecommendationService {
    async fn recommend(&self, request: RecommendRequest) -> Result<Recommendations> {
        self.budgeted("recommend", self.recommend_within_budget(&request))
            .await
    }

    async fn similar_for_user(
        &self,
        item_id: ItemId,
        user_id: Option<UserId>,
        k: usize,
        blend_ratio: Option<f32>,
        filters: &SearchFilters,
    ) -> Result<Recommendations> {
        self.budgeted(
            "similar_for_user",
            self.similar_within_budget(item_id, user_id, k, blend_ratio, filters),
        )
        .await
    }

    fn explain(&self, result: &RankedResult) -> String {
        self.ranker.explain(result)
    }
}

impl std::fmt::Debug for RecommendationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationService")
            .field("ranker", &self.ranker)
            .field("config", &self.config)
            .finish()
    }
}

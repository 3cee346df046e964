//! Application Service Port Interfaces
//!
//! Contracts implemented by the use cases in this crate. The composition
//! root hands services to each other (and to outer layers) through these
//! traits.

use std::time::Duration;

use async_trait::async_trait;
use recs_domain::error::Result;
use recs_domain::value_objects::{
    Embedding, InteractionEvent, ItemId, RankedResult, SearchFilters, SearchResults,
    SearchStrategy, UserId,
};

use crate::use_cases::recommendation::{RecommendRequest, Recommendations};

// ============================================================================
// Filtered Search Interface
// ============================================================================

/// Attribute-filtered nearest-neighbor search
#[async_trait]
pub trait FilteredSearchInterface: Send + Sync {
    /// Up to `k` neighbors of `query` matching `filters`
    ///
    /// `strategy` forces subset or postfilter execution; `None` chooses by
    /// estimated selectivity.
    async fn search(
        &self,
        query: &Embedding,
        k: usize,
        filters: &SearchFilters,
        strategy: Option<SearchStrategy>,
    ) -> Result<SearchResults>;

    /// Items similar to `item_id`; empty when the item has no vector
    async fn search_similar(
        &self,
        item_id: ItemId,
        k: usize,
        filters: &SearchFilters,
        exclude_self: bool,
    ) -> Result<SearchResults>;

    /// Current vector of an item (cache first, then the index)
    async fn item_vector(&self, item_id: ItemId) -> Result<Option<Embedding>>;

    /// Keep the ids matching `filters`, in order
    ///
    /// The flag is set when the catalog was unavailable and the ids were
    /// returned unfiltered.
    async fn retain_matching(
        &self,
        item_ids: Vec<ItemId>,
        filters: &SearchFilters,
    ) -> Result<(Vec<ItemId>, bool)>;
}

// ============================================================================
// Feedback Service Interface
// ============================================================================

/// What applying one interaction changed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackOutcome {
    /// Session vector rewritten
    pub session_updated: bool,
    /// Long-term update handed to the background worker
    pub long_term_queued: bool,
    /// Cached ranked results of the user invalidated
    pub results_invalidated: bool,
    /// Signed interaction weight used
    pub weight: f32,
    /// Wall time spent on the request path
    pub elapsed: Duration,
}

/// Interaction recording and user vector maintenance
#[async_trait]
pub trait FeedbackServiceInterface: Send + Sync {
    /// Apply one interaction to the user's vectors
    ///
    /// Long-term updates are deferred; their failure never fails this call.
    async fn apply(&self, event: &InteractionEvent) -> Result<FeedbackOutcome>;

    /// Wait until every queued long-term update has been processed
    async fn flush(&self) -> Result<()>;
}

// ============================================================================
// Recommendation Service Interface
// ============================================================================

/// Personalized retrieval and ranking
#[async_trait]
pub trait RecommendationServiceInterface: Send + Sync {
    /// Ranked recommendations for a request, within the latency budget
    async fn recommend(&self, request: RecommendRequest) -> Result<Recommendations>;

    /// Items similar to `item_id`, nudged towards the user's taste
    async fn similar_for_user(
        &self,
        item_id: ItemId,
        user_id: Option<UserId>,
        k: usize,
        blend_ratio: Option<f32>,
        filters: &SearchFilters,
    ) -> Result<Recommendations>;

    /// Human-readable scoring account of a result
    fn explain(&self, result: &RankedResult) -> String;
}

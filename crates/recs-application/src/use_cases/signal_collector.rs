//! Ranking Signal Collection
//!
//! Gathers the auxiliary ranking signals for a candidate set from the
//! catalog. Never fails: when the catalog is unavailable popularity falls
//! back to the cache's view counters and the other signals stay neutral.

use std::sync::Arc;

use chrono::Utc;
use recs_domain::ports::providers::CatalogProvider;
use recs_domain::value_objects::{BrandPreferences, ItemId, PriceProfile, RankingConfig, UserId};

use super::embedding_cache::EmbeddingCache;
use crate::domain_services::ranking::{
    BrandAffinityScorer, PopularityScorer, PriceAffinityScorer, RankingSignals,
};

/// Collects [`RankingSignals`] for candidates
#[derive(Debug)]
pub struct SignalCollector {
    catalog: Arc<dyn CatalogProvider>,
    cache: Arc<EmbeddingCache>,
    popularity: PopularityScorer,
    price: PriceAffinityScorer,
    brand: BrandAffinityScorer,
}

impl SignalCollector {
    /// Create a collector with scorers built from `config`
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        cache: Arc<EmbeddingCache>,
        config: &RankingConfig,
    ) -> Self {
        Self {
            catalog,
            cache,
            popularity: PopularityScorer::from_config(config),
            price: PriceAffinityScorer::from_config(config),
            brand: BrandAffinityScorer,
        }
    }

    /// Signals for `items`, personalized for `user` when given
    pub async fn collect(&self, user: Option<UserId>, items: &[ItemId]) -> RankingSignals {
        let mut signals = RankingSignals::neutral();
        if items.is_empty() {
            return signals;
        }
        self.collect_popularity(items, &mut signals).await;
        if let Some(user) = user {
            self.collect_affinities(user, items, &mut signals).await;
        }
        signals
    }

    async fn collect_popularity(&self, items: &[ItemId], signals: &mut RankingSignals) {
        match self.catalog.popularity_stats(items).await {
            Ok(stats) => {
                let now = Utc::now();
                for (id, item_stats) in &stats {
                    signals
                        .popularity
                        .insert(*id, self.popularity.score(item_stats, now));
                }
            }
            Err(e) => {
                signals.degraded = true;
                tracing::warn!(error = %e, "popularity stats unavailable, using view counters");
                match self.cache.view_counts(items).await {
                    Ok(counts) => {
                        for (id, views) in counts {
                            signals.popularity.insert(id, self.popularity.score_views(views));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "view counters unavailable, popularity neutral");
                    }
                }
            }
        }
    }

    async fn collect_affinities(&self, user: UserId, items: &[ItemId], signals: &mut RankingSignals) {
        let (prices, brands) = futures::join!(
            self.catalog.user_purchase_prices(user),
            self.catalog.user_brand_interactions(user)
        );
        let profile = match prices {
            Ok(prices) => PriceProfile::from_prices(&prices),
            Err(e) => {
                signals.degraded = true;
                tracing::warn!(user_id = user.get(), error = %e, "purchase history unavailable");
                None
            }
        };
        let preferences = match brands {
            Ok(history) => Some(BrandPreferences::from_interactions(&history))
                .filter(|prefs| !prefs.is_empty()),
            Err(e) => {
                signals.degraded = true;
                tracing::warn!(user_id = user.get(), error = %e, "brand history unavailable");
                None
            }
        };
        if profile.is_none() && preferences.is_none() {
            return;
        }

        let attributes = match self.catalog.item_attributes(items).await {
            Ok(attributes) => attributes,
            Err(e) => {
                signals.degraded = true;
                tracing::warn!(error = %e, "item attributes unavailable, affinities neutral");
                return;
            }
        };
        for (id, attrs) in &attributes {
            if let (Some(profile), Some(price)) = (&profile, attrs.price) {
                signals.price_affinity.insert(*id, self.price.score(price, profile));
            }
            if let (Some(preferences), Some(brand)) = (&preferences, attrs.brand_id) {
                signals
                    .brand_affinity
                    .insert(*id, self.brand.score(brand, preferences));
            }
        }
    }
}

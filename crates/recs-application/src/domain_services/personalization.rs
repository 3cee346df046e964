//! Personalization Blending
//!
//! Turns a user's stored vectors (and optionally a query or item vector)
//! into one query vector for the current request context.
//!
//! ## Blend rule
//!
//! Each present vector is weighted by its context weight, the weights are
//! renormalized over the vectors actually present, and the sum is scaled
//! back to unit length. A missing long-term or session vector shifts its
//! share onto the others instead of failing.

use recs_domain::error::Result;
use recs_domain::value_objects::{
    ContextWeights, Embedding, PersonalizationConfig, RequestContext, UserVectors,
};

/// Result of a blend
#[derive(Debug, Clone, PartialEq)]
pub enum BlendOutcome {
    /// A unit-length personalized query vector
    Blended(Embedding),
    /// The user has nothing to personalize with; fall back to a
    /// non-personalized path
    NoPersonalization,
}

impl BlendOutcome {
    /// The blended vector, if any
    pub fn embedding(&self) -> Option<&Embedding> {
        match self {
            Self::Blended(embedding) => Some(embedding),
            Self::NoPersonalization => None,
        }
    }

    /// Consume into the blended vector, if any
    pub fn into_embedding(self) -> Option<Embedding> {
        match self {
            Self::Blended(embedding) => Some(embedding),
            Self::NoPersonalization => None,
        }
    }

    /// Whether a personalized vector was produced
    pub fn is_personalized(&self) -> bool {
        matches!(self, Self::Blended(_))
    }
}

/// Context-aware blender of user and query vectors
#[derive(Debug, Clone, Default)]
pub struct PersonalizationBlender {
    config: PersonalizationConfig,
}

impl PersonalizationBlender {
    /// Create a blender with per-context weights
    pub fn new(config: PersonalizationConfig) -> Self {
        Self { config }
    }

    /// Weights used for a context
    pub fn weights_for(&self, context: RequestContext) -> ContextWeights {
        self.config.weights_for(context)
    }

    /// Default item share for personalized similar items
    pub fn item_blend_ratio(&self) -> f32 {
        self.config.item_blend_ratio
    }

    /// Blend a user's vectors with an optional query vector
    ///
    /// Returns [`BlendOutcome::NoPersonalization`] when the user has no
    /// stored vectors, when no present user vector carries a positive
    /// weight in `context`, or when the weighted sum cancels out.
    /// Vectors of differing dimension fail with `DimensionMismatch`.
    pub fn blend(
        &self,
        user: &UserVectors,
        query: Option<&Embedding>,
        context: RequestContext,
    ) -> Result<BlendOutcome> {
        if user.is_anonymous() {
            return Ok(BlendOutcome::NoPersonalization);
        }
        let weights = self.weights_for(context);

        let mut terms: Vec<(f32, &Embedding)> = Vec::with_capacity(3);
        if let Some(long_term) = &user.long_term {
            terms.push((weights.long_term, long_term));
        }
        if let Some(session) = &user.session {
            terms.push((weights.session, session));
        }
        terms.retain(|(w, _)| *w > 0.0);
        if terms.is_empty() {
            return Ok(BlendOutcome::NoPersonalization);
        }
        if let Some(query) = query {
            if weights.query > 0.0 {
                terms.push((weights.query, query));
            }
        }

        let total: f32 = terms.iter().map(|(w, _)| w).sum();
        let normalized: Vec<(f32, &Embedding)> =
            terms.into_iter().map(|(w, e)| (w / total, e)).collect();

        Ok(match Embedding::weighted_sum(&normalized)? {
            Some(embedding) => BlendOutcome::Blended(embedding),
            None => BlendOutcome::NoPersonalization,
        })
    }

    /// Nudge an item vector towards a user
    ///
    /// `blend_ratio` (clamped to `[0, 1]`) is the share of the item vector.
    /// The user side combines long-term and session vectors with the
    /// similar-item context weights. An anonymous user, or a blend that
    /// cancels out, yields the item vector unchanged.
    pub fn blend_item_and_user(
        &self,
        item: &Embedding,
        user: &UserVectors,
        blend_ratio: f32,
    ) -> Result<Embedding> {
        let ratio = if blend_ratio.is_finite() {
            blend_ratio.clamp(0.0, 1.0)
        } else {
            self.config.item_blend_ratio.clamp(0.0, 1.0)
        };
        let Some(user_vector) = self.user_vector(user)? else {
            return Ok(item.clone());
        };
        let blended = Embedding::weighted_sum(&[(ratio, item), (1.0 - ratio, &user_vector)])?;
        Ok(blended.unwrap_or_else(|| item.clone()))
    }

    /// Combined user vector for the similar-item context
    fn user_vector(&self, user: &UserVectors) -> Result<Option<Embedding>> {
        let weights = self.weights_for(RequestContext::Similar);
        match (&user.long_term, &user.session) {
            (None, None) => Ok(None),
            (Some(only), None) | (None, Some(only)) => Ok(Some(only.clone())),
            (Some(long_term), Some(session)) => {
                let (lw, sw) = if weights.long_term + weights.session > 0.0 {
                    (weights.long_term, weights.session)
                } else {
                    (0.5, 0.5)
                };
                Embedding::weighted_sum(&[(lw, long_term), (sw, session)])
            }
        }
    }
}

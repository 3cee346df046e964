//! Interaction Value Objects
//!
//! User interactions and the fixed tables that turn them into vector
//! updates: a signed weight and a session decay window.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{ItemId, UserId};
use super::user::RequestContext;
use crate::error::{Error, Result};

/// Kind of user interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// Item detail viewed
    View,
    /// Item clicked in a list
    Click,
    /// Item added to cart
    AddToCart,
    /// Explicit like
    Like,
    /// Explicit dislike
    Dislike,
    /// Thumbs up on a recommendation
    ThumbsUp,
    /// Thumbs down on a recommendation
    ThumbsDown,
    /// Star rating, 1 to 5
    Rating,
    /// Purchase
    Purchase,
}

impl InteractionType {
    /// All interaction types
    pub const ALL: [InteractionType; 9] = [
        Self::View,
        Self::Click,
        Self::AddToCart,
        Self::Like,
        Self::Dislike,
        Self::ThumbsUp,
        Self::ThumbsDown,
        Self::Rating,
        Self::Purchase,
    ];

    /// Signed update weight
    ///
    /// Ratings map `(r - 3) / 2` so 5 stars is `+1.0`, 1 star is `-1.0`
    /// and 3 stars leaves the vector unchanged. A rating interaction
    /// without a rating value weighs 0.
    pub fn weight(self, rating: Option<f32>) -> f32 {
        match self {
            Self::View => 0.1,
            Self::Click => 0.3,
            Self::AddToCart => 0.7,
            Self::Like | Self::ThumbsUp => 1.0,
            Self::Purchase => 2.0,
            Self::Dislike | Self::ThumbsDown => -1.0,
            Self::Rating => rating.map_or(0.0, |r| (r.clamp(1.0, 5.0) - 3.0) / 2.0),
        }
    }

    /// How long a session vector written by this interaction lives
    pub fn session_decay(self) -> Duration {
        let minutes = match self {
            Self::View => 10,
            Self::Click => 15,
            Self::AddToCart => 60,
            Self::Purchase => 120,
            Self::Like | Self::ThumbsUp | Self::Dislike | Self::ThumbsDown | Self::Rating => 30,
        };
        Duration::from_secs(minutes * 60)
    }

    /// Whether the weight can be negative
    pub fn is_negative(self) -> bool {
        matches!(self, Self::Dislike | Self::ThumbsDown)
    }

    /// Stable snake_case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Click => "click",
            Self::AddToCart => "add_to_cart",
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::ThumbsUp => "thumbs_up",
            Self::ThumbsDown => "thumbs_down",
            Self::Rating => "rating",
            Self::Purchase => "purchase",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| Error::invalid_argument(format!("unknown interaction type: {s}")))
    }
}

/// A single recorded interaction
///
/// Immutable once created. `event_id` makes deferred processing
/// idempotent: a redelivered event is recognised and skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Unique event identifier
    pub event_id: Uuid,
    /// Acting user
    pub user_id: UserId,
    /// Target item
    pub item_id: ItemId,
    /// Interaction kind
    pub interaction: InteractionType,
    /// Star rating for [`InteractionType::Rating`]
    pub rating: Option<f32>,
    /// When the interaction happened
    pub timestamp: DateTime<Utc>,
    /// Surface the interaction came from
    pub context: Option<RequestContext>,
}

impl InteractionEvent {
    /// New event with a fresh id and the current timestamp
    pub fn new(user_id: UserId, item_id: ItemId, interaction: InteractionType) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            user_id,
            item_id,
            interaction,
            rating: None,
            timestamp: Utc::now(),
            context: None,
        }
    }

    /// Rating event
    pub fn rating(user_id: UserId, item_id: ItemId, rating: f32) -> Self {
        Self {
            rating: Some(rating),
            ..Self::new(user_id, item_id, InteractionType::Rating)
        }
    }

    /// Attach the originating context
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Check event consistency
    pub fn validate(&self) -> Result<()> {
        match (self.interaction, self.rating) {
            (InteractionType::Rating, None) => Err(Error::invalid_argument(
                "rating interaction requires a rating value",
            )),
            (InteractionType::Rating, Some(r)) if !(1.0..=5.0).contains(&r) => Err(
                Error::invalid_argument(format!("rating must be within 1..=5, got {r}")),
            ),
            _ => Ok(()),
        }
    }

    /// Signed update weight of this event
    pub fn weight(&self) -> f32 {
        self.interaction.weight(self.rating)
    }

    /// Session decay window of this event
    pub fn session_ttl(&self) -> Duration {
        self.interaction.session_decay()
    }
}

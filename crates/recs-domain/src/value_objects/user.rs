//! User Value Objects

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::embedding::Embedding;
use crate::error::Error;

/// Where a request originates, which decides how user vectors are blended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestContext {
    /// Home feed: long-term taste dominates
    #[default]
    Feed,
    /// Free-text or query-vector search
    Search,
    /// "More like this" on an item page
    Similar,
}

impl RequestContext {
    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Search => "search",
            Self::Similar => "similar",
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestContext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "feed" => Ok(Self::Feed),
            "search" => Ok(Self::Search),
            "similar" | "similar_item" | "similar-item" => Ok(Self::Similar),
            other => Err(Error::invalid_argument(format!(
                "unknown request context: {other}"
            ))),
        }
    }
}

/// Snapshot of a user's stored vectors
///
/// Both vectors are absent for a user that has never interacted
/// (cold start / anonymous).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserVectors {
    /// Slow-moving taste profile
    pub long_term: Option<Embedding>,
    /// Fast-moving intent, expires with the session decay window
    pub session: Option<Embedding>,
}

impl UserVectors {
    /// No stored vectors
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Whether neither vector is present
    pub fn is_anonymous(&self) -> bool {
        self.long_term.is_none() && self.session.is_none()
    }
}

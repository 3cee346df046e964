//! Application Layer - Recs Engine
//!
//! Use cases of the retrieval, personalization and ranking engine. The
//! crate depends only on `recs-domain`; concrete providers are injected as
//! `Arc<dyn Port>` by the infrastructure layer.
//!
//! ## Request path
//!
//! ```text
//! EmbeddingCache ──► PersonalizationBlender ──► FilteredSearchService ──► Ranker
//!   (user vectors)      (query vector)            (candidates)            (order)
//! ```
//!
//! ## Feedback path
//!
//! ```text
//! InteractionEvent ──► FeedbackUpdater ──► session vector (inline)
//!                                     └──► LongTermUpdateQueue ──► worker ──► long-term vector
//! ```

pub mod domain_services;
pub mod ports;
pub mod use_cases;

pub use domain_services::*;
pub use ports::services::*;
pub use use_cases::*;

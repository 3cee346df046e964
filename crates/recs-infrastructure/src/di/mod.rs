//! Composition root
//!
//! [`EngineContext`] owns every provider and service of one engine
//! instance; see [`bootstrap`] for how they are wired.

pub mod bootstrap;

pub use bootstrap::{
    EngineContext, create_cache_provider, create_estimator, init_engine, open_vector_index,
};

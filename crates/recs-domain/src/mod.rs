//! # Domain Layer
//!
//! Core types and contracts of the retrieval, personalization and ranking
//! engine. Nothing in this crate performs I/O; the ports describe what the
//! engine needs from the outside world and the value objects carry the
//! invariants (unit-length embeddings, fixed dimensions, signed interaction
//! weights) that every other layer relies on.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error taxonomy and `Result` alias |
//! | [`constants`] | Tunable defaults shared across layers |
//! | [`value_objects`] | Embeddings, items, users, interactions, search and ranking types |
//! | [`ports`] | Traits for the vector index, cache backend, catalog and selectivity estimation |

pub mod constants;
pub mod error;
pub mod ports;
pub mod value_objects;

pub use error::{Error, Result};
pub use value_objects::*;

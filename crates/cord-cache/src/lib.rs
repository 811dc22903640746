//! # cord-cache
//!
//! In-memory entity cache mutated by the gateway session's dispatch routing.

mod entity_cache;

pub use entity_cache::EntityCache;

//! Cache Module
//!
//! Bounded in-memory caching with lazy TTL expiration and LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::{NodeId, RecencyList};
pub use stats::CacheStats;
pub use store::BoundedTtlCache;

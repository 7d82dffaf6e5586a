//! Cache Entry Module
//!
//! Defines a single cached item together with the instant it was stored.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A stored payload plus the metadata needed for eviction and expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Key that produced this entry, used to clean the index on eviction
    pub key: String,
    /// The stored payload
    pub payload: V,
    /// Insertion instant. Reads never refresh it.
    pub cached_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stamped with the current instant.
    pub fn new(key: impl Into<String>, payload: V) -> Self {
        Self::stamped(key, payload, Instant::now())
    }

    /// Creates an entry stamped with an explicit instant.
    pub fn stamped(key: impl Into<String>, payload: V, cached_at: Instant) -> Self {
        Self {
            key: key.into(),
            payload,
            cached_at,
        }
    }

    // == Age ==
    /// Time elapsed since insertion, measured against `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.cached_at)
    }

    // == Is Expired ==
    /// Checks whether the entry has outlived `ttl`.
    ///
    /// Boundary condition: an age exactly equal to `ttl` counts as expired,
    /// so a zero TTL expires every entry on its first read.
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        self.age(now) >= ttl
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_not_expired_before_ttl() {
        let entry = CacheEntry::new("GET:http://a/", "body");

        tokio::time::advance(Duration::from_millis(999)).await;

        assert!(!entry.is_expired(Duration::from_secs(1), Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expired_after_ttl() {
        let entry = CacheEntry::new("GET:http://a/", "body");

        tokio::time::advance(Duration::from_millis(1001)).await;

        assert!(entry.is_expired(Duration::from_secs(1), Instant::now()));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = CacheEntry::stamped("k", (), now);

        assert!(entry.is_expired(Duration::from_secs(5), now + Duration::from_secs(5)));
        assert!(!entry.is_expired(
            Duration::from_secs(5),
            now + Duration::from_secs(5) - Duration::from_nanos(1)
        ));
    }

    #[test]
    fn test_zero_ttl_is_always_expired() {
        let now = Instant::now();
        let entry = CacheEntry::stamped("k", (), now);

        assert!(entry.is_expired(Duration::ZERO, now));
    }

    #[test]
    fn test_age_before_insertion_is_zero() {
        let now = Instant::now();
        let entry = CacheEntry::stamped("k", (), now + Duration::from_secs(1));

        assert_eq!(entry.age(now), Duration::ZERO);
    }
}

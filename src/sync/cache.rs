use std::time::Duration;
use tokio::time::Instant;

/// Value cache with a freshness window and last-known-good fallback.
///
/// Failures never evict: `record_failure` keeps the previous value and only
/// records the error message, so readers keep showing stale data instead of
/// flashing an empty view.
#[derive(Debug, Clone)]
pub struct StaleCache<T> {
    value: Option<T>,
    stored_at: Option<Instant>,
    last_error: Option<String>,
    ttl: Duration,
}

impl<T> StaleCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { value: None, stored_at: None, last_error: None, ttl }
    }

    /// Replace the value and clear any recorded error
    pub fn store(&mut self, value: T) {
        self.value = Some(value);
        self.stored_at = Some(Instant::now());
        self.last_error = None;
    }

    /// Keep the current value, remember why the refresh failed
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Value only if it is within the TTL
    pub fn fresh(&self) -> Option<&T> {
        if self.is_fresh() {
            self.value.as_ref()
        } else {
            None
        }
    }

    /// Last successfully stored value, however old
    pub fn last_good(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_fresh(&self) -> bool {
        match self.stored_at {
            Some(at) => at.elapsed() < self.ttl,
            None => false,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drop value and error (sign-out, session end)
    pub fn clear(&mut self) {
        self.value = None;
        self.stored_at = None;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache() {
        let cache: StaleCache<u32> = StaleCache::new(Duration::from_secs(30));
        assert!(cache.fresh().is_none());
        assert!(cache.last_good().is_none());
        assert!(!cache.is_fresh());
    }

    #[test]
    fn test_failure_keeps_last_good_value() {
        let mut cache = StaleCache::new(Duration::from_secs(30));
        cache.store(vec![1, 2, 3]);
        cache.record_failure("Request timed out");

        assert_eq!(cache.last_good(), Some(&vec![1, 2, 3]));
        assert_eq!(cache.error(), Some("Request timed out"));

        cache.store(vec![4]);
        assert_eq!(cache.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_goes_stale_after_ttl() {
        let mut cache = StaleCache::new(Duration::from_secs(30));
        cache.store("balances");
        assert_eq!(cache.fresh(), Some(&"balances"));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.fresh().is_none());
        assert_eq!(cache.last_good(), Some(&"balances"));
    }

    #[test]
    fn test_clear() {
        let mut cache = StaleCache::new(Duration::from_secs(30));
        cache.store(1u8);
        cache.record_failure("boom");
        cache.clear();
        assert!(cache.last_good().is_none());
        assert!(cache.error().is_none());
    }
}

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of keys with an operation currently in flight.
///
/// Keys are released when the returned [`FlightGuard`] is dropped, so early
/// returns and `?` cannot leak a key.
#[derive(Debug)]
pub struct FlightSet<K: Eq + Hash> {
    inner: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash> Clone for FlightSet<K> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<K: Eq + Hash> Default for FlightSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> FlightSet<K> {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(HashSet::new())) }
    }

    // The set only holds plain keys, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashSet<K>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `key`. Returns `None` if another caller already holds it.
    pub fn try_begin(&self, key: K) -> Option<FlightGuard<K>>
    where
        K: Clone,
    {
        let mut guard = self.lock();
        if !guard.insert(key.clone()) {
            return None;
        }
        Some(FlightGuard { inner: Arc::clone(&self.inner), key: Some(key) })
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    /// Number of keys currently in flight
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its key on drop
#[derive(Debug)]
pub struct FlightGuard<K: Eq + Hash> {
    inner: Arc<Mutex<HashSet<K>>>,
    key: Option<K>,
}

impl<K: Eq + Hash> FlightGuard<K> {
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }
}

impl<K: Eq + Hash> Drop for FlightGuard<K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let mut set = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            set.remove(&key);
        }
    }
}

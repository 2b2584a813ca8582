use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{StoreError, TokenStore};

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const MIN_SWEEP_LEN: usize = 1024;

struct Entry {
    value: String,
    expires_at: Instant,
}

struct Entries {
    map: HashMap<String, Entry>,
    last_sweep: Instant,
    /// A write that grows the map past this size sweeps immediately.
    sweep_at_len: usize,
}

impl Entries {
    fn evict_expired(&mut self, now: Instant) {
        self.map.retain(|_, v| v.expires_at > now);
        self.last_sweep = now;
        self.sweep_at_len = (self.map.len() * 2).max(MIN_SWEEP_LEN);
    }
}

/// Process-local store with per-key expiry.
///
/// Only suitable for a single node. Reads drop the expired key they hit;
/// writes sweep the whole map once a second, or sooner when it has doubled
/// since the last sweep, so keys that are never read again still go away.
pub struct InMemoryTokenStore {
    entries: Mutex<Entries>,
    sweep_interval: Duration,
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::with_sweep_interval(SWEEP_INTERVAL)
    }
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                last_sweep: Instant::now(),
                sweep_at_len: MIN_SWEEP_LEN,
            }),
            sweep_interval,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Entries>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Command("in-memory store lock poisoned".to_string()))
    }

    fn live_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock()?;
        match entries.map.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Remaining lifetime of a live key.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.lock().ok()?;
        entries
            .map
            .get(key)
            .and_then(|entry| entry.expires_at.checked_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live_value(key)?.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.live_value(key)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        };
        let mut entries = self.lock()?;
        entries.map.insert(key.to_string(), entry);

        let now = Instant::now();
        if entries.map.len() > entries.sweep_at_len
            || now.duration_since(entries.last_sweep) >= self.sweep_interval
        {
            entries.evict_expired(now);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryTokenStore::new();

        store.set_ex("k", "v", 60).await.unwrap();
        assert!(store.exists("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.delete("k").await.unwrap();
        assert!(!store.exists("k").await.unwrap());
        // deleting twice is fine
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_ttl() {
        let store = InMemoryTokenStore::new();

        store.set_ex("k", "old", 10).await.unwrap();
        store.set_ex("k", "new", 600).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
        assert!(store.ttl("k").unwrap() > Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_zero_ttl_entry_is_never_visible() {
        let store = InMemoryTokenStore::new();

        store.set_ex("k", "v", 0).await.unwrap();
        assert!(!store.exists("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_keys_are_swept_on_write() {
        let store = InMemoryTokenStore::with_sweep_interval(Duration::from_millis(200));

        for i in 0..1000 {
            store.set_ex(&format!("refresh:deny:{}", i), "rotated", 1).await.unwrap();
        }
        store.set_ex("refresh:deny:live", "rotated", 600).await.unwrap();
        assert_eq!(store.len(), 1001);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        for i in 0..10 {
            store.set_ex(&format!("refresh:deny:new{}", i), "rotated", 600).await.unwrap();
        }
        assert_eq!(store.len(), 11);
        assert!(store.exists("refresh:deny:live").await.unwrap());
    }

    #[tokio::test]
    async fn test_growth_triggers_sweep_before_interval() {
        let store = InMemoryTokenStore::with_sweep_interval(Duration::from_secs(3600));

        // Already expired on insert; only the size trigger can remove them.
        for i in 0..=MIN_SWEEP_LEN {
            store.set_ex(&format!("k{}", i), "v", 0).await.unwrap();
        }
        assert!(store.len() < MIN_SWEEP_LEN);
    }
}

// web-server/src/auth/store.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::Clock;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store with per-key expiry holding one-time verification codes.
///
/// `get` must never return a value whose TTL has elapsed.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Store key for the verification record of `email`
pub fn verification_key(email: &str) -> String {
    format!("verification:{}", email)
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: i64,
}

/// In-process credential store. Entries past their TTL are invisible to `get`
/// and removed either lazily on read or by [`MemoryCredentialStore::purge_expired`].
pub struct MemoryCredentialStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCredentialStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = self.clock.now_millis() + ttl.as_millis() as i64;
        self.entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now_millis();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ManualClock;

    fn store() -> (Arc<ManualClock>, MemoryCredentialStore) {
        let clock = Arc::new(ManualClock::new(0));
        let store = MemoryCredentialStore::new(clock.clone());
        (clock, store)
    }

    #[actix_web::test]
    async fn test_put_get_delete() {
        let (_clock, store) = store();
        store.put("k", "v".to_string(), Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn test_expired_value_is_never_returned() {
        let (clock, store) = store();
        store.put("k", "v".to_string(), Duration::from_secs(10)).await.unwrap();

        clock.advance(Duration::from_millis(9_999));
        assert!(store.get("k").await.unwrap().is_some());

        clock.advance(Duration::from_millis(1));
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn test_put_overwrites_and_resets_ttl() {
        let (clock, store) = store();
        store.put("k", "old".to_string(), Duration::from_secs(10)).await.unwrap();
        clock.advance(Duration::from_secs(8));
        store.put("k", "new".to_string(), Duration::from_secs(10)).await.unwrap();
        clock.advance(Duration::from_secs(8));

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[actix_web::test]
    async fn test_purge_expired() {
        let (clock, store) = store();
        store.put("short", "v".to_string(), Duration::from_secs(1)).await.unwrap();
        store.put("long", "v".to_string(), Duration::from_secs(60)).await.unwrap();

        clock.advance(Duration::from_secs(2));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_verification_key() {
        assert_eq!(verification_key("a@x.com"), "verification:a@x.com");
    }
}

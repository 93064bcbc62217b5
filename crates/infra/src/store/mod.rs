mod inmemory;
mod redis;

use std::time::Duration;
use tokio::sync::broadcast;

pub use self::redis::RedisKeyValueStore;
pub use inmemory::InMemoryKeyValueStore;

/// The shared key/value store every server coordinates through.
///
/// Besides plain values and sets it exposes the two primitives the completion
/// pipeline is built on: set-if-absent with TTL (the per-timer completion
/// mutex) and a key-expiry notification channel (the completion trigger).
/// Expiry notifications are broadcast: every subscriber on every server
/// receives every expired key.
#[async_trait::async_trait]
pub trait IKeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()>;

    /// Atomically sets the key only if it does not exist. Returns whether the
    /// write happened.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool>;

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Refreshes the TTL of an existing key. Returns false when the key is
    /// gone.
    async fn expire(&self, key: &str, ttl: Duration) -> anyhow::Result<bool>;

    /// Adds a member to a set, refreshing the set TTL when one is given.
    async fn set_add(&self, key: &str, member: &str, ttl: Option<Duration>) -> anyhow::Result<()>;

    async fn set_remove(&self, key: &str, member: &str) -> anyhow::Result<()>;

    async fn set_size(&self, key: &str) -> anyhow::Result<i64>;

    async fn set_members(&self, key: &str) -> anyhow::Result<Vec<String>>;

    /// Whether two sets share at least one member. Must not materialize the
    /// intersection; this runs on every bus event on every server.
    async fn sets_intersect(&self, first: &str, second: &str) -> anyhow::Result<bool>;

    /// Subscribes to key-expiry notifications. Each received value is the
    /// expired key.
    fn expirations(&self) -> broadcast::Receiver<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{sleep, timeout};

    fn store() -> Arc<dyn IKeyValueStore> {
        Arc::new(InMemoryKeyValueStore::new())
    }

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let store = store();
        store.set("k1", "v1", None).await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), Some("v1".to_string()));

        store.delete("k1").await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_key_is_gone_and_notified() {
        let store = store();
        let mut expirations = store.expirations();

        store
            .set("timer:schedule:abc", "abc", Some(Duration::from_millis(50)))
            .await
            .unwrap();

        let expired = timeout(Duration::from_secs(2), expirations.recv())
            .await
            .expect("expiry notification within deadline")
            .unwrap();
        assert_eq!(expired, "timer:schedule:abc");
        assert_eq!(store.get("timer:schedule:abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwriting_cancels_the_pending_expiry() {
        let store = store();
        let mut expirations = store.expirations();

        store
            .set("k", "v1", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        store.set("k", "v2", Some(Duration::from_secs(600))).await.unwrap();

        sleep(Duration::from_millis(150)).await;
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
        assert!(expirations.try_recv().is_err());
    }

    #[tokio::test]
    async fn delete_then_set_acts_as_replace() {
        let store = store();
        store
            .set("k", "old", Some(Duration::from_secs(600)))
            .await
            .unwrap();
        store.delete("k").await.unwrap();
        store
            .set("k", "new", Some(Duration::from_secs(600)))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn set_if_absent_has_mutex_semantics() {
        let store = store();
        let ttl = Duration::from_secs(300);

        assert!(store
            .set_if_absent("timer:processing:t1", "server-1", ttl)
            .await
            .unwrap());
        assert!(!store
            .set_if_absent("timer:processing:t1", "server-2", ttl)
            .await
            .unwrap());
        assert_eq!(
            store.get("timer:processing:t1").await.unwrap(),
            Some("server-1".to_string())
        );

        store.delete("timer:processing:t1").await.unwrap();
        assert!(store
            .set_if_absent("timer:processing:t1", "server-2", ttl)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn refresh_keeps_a_key_alive() {
        let store = store();
        store
            .set("k", "v", Some(Duration::from_millis(80)))
            .await
            .unwrap();
        assert!(store.expire("k", Duration::from_secs(600)).await.unwrap());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        assert!(!store.expire("missing", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn set_operations_and_intersection() {
        let store = store();
        store.set_add("timer:t1:online_users", "u1", None).await.unwrap();
        store.set_add("timer:t1:online_users", "u2", None).await.unwrap();
        store.set_add("server:s1:users", "u2", None).await.unwrap();
        store.set_add("server:s2:users", "u9", None).await.unwrap();

        assert_eq!(store.set_size("timer:t1:online_users").await.unwrap(), 2);
        assert!(store
            .sets_intersect("timer:t1:online_users", "server:s1:users")
            .await
            .unwrap());
        assert!(!store
            .sets_intersect("timer:t1:online_users", "server:s2:users")
            .await
            .unwrap());

        store
            .set_remove("timer:t1:online_users", "u2")
            .await
            .unwrap();
        assert!(!store
            .sets_intersect("timer:t1:online_users", "server:s1:users")
            .await
            .unwrap());

        let mut members = store.set_members("timer:t1:online_users").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn sets_decay_with_their_ttl() {
        let store = store();
        store
            .set_add("server:s1:users", "u1", Some(Duration::from_millis(50)))
            .await
            .unwrap();

        sleep(Duration::from_millis(150)).await;
        assert_eq!(store.set_size("server:s1:users").await.unwrap(), 0);
    }
}

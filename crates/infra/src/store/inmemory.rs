use super::IKeyValueStore;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

struct ValueEntry {
    value: String,
    expires_at: Option<Instant>,
    version: u64,
}

struct SetEntry {
    members: HashSet<String>,
    expires_at: Option<Instant>,
    version: u64,
}

/// In-process store with real TTL semantics, including expiry notifications.
/// Used by tests and single-node local runs; the completion pipeline behaves
/// the same against it as against Redis.
pub struct InMemoryKeyValueStore {
    values: Arc<Mutex<HashMap<String, ValueEntry>>>,
    sets: Arc<Mutex<HashMap<String, SetEntry>>>,
    expired_tx: broadcast::Sender<String>,
    versions: AtomicU64,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        let (expired_tx, _) = broadcast::channel(1024);
        Self {
            values: Arc::new(Mutex::new(HashMap::new())),
            sets: Arc::new(Mutex::new(HashMap::new())),
            expired_tx,
            versions: AtomicU64::new(0),
        }
    }

    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::Relaxed)
    }

    /// Fires when the version recorded at write time is still current, so a
    /// delete or overwrite between write and deadline silences the timer.
    fn arm_value_expiry(&self, key: String, version: u64, deadline: Instant) {
        let values = self.values.clone();
        let tx = self.expired_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let fired = {
                let mut values = values.lock().unwrap();
                match values.get(&key) {
                    Some(entry) if entry.version == version => {
                        values.remove(&key);
                        true
                    }
                    _ => false,
                }
            };
            if fired {
                let _ = tx.send(key);
            }
        });
    }

    fn arm_set_expiry(&self, key: String, version: u64, deadline: Instant) {
        let sets = self.sets.clone();
        let tx = self.expired_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let fired = {
                let mut sets = sets.lock().unwrap();
                match sets.get(&key) {
                    Some(entry) if entry.version == version => {
                        sets.remove(&key);
                        true
                    }
                    _ => false,
                }
            };
            if fired {
                let _ = tx.send(key);
            }
        });
    }

    fn live_members(&self, key: &str) -> HashSet<String> {
        let now = Instant::now();
        let sets = self.sets.lock().unwrap();
        match sets.get(key) {
            Some(entry) if entry.expires_at.map(|at| at > now).unwrap_or(true) => {
                entry.members.clone()
            }
            _ => HashSet::new(),
        }
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for InMemoryKeyValueStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let version = self.next_version();
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        {
            let mut values = self.values.lock().unwrap();
            values.insert(
                key.to_string(),
                ValueEntry {
                    value: value.to_string(),
                    expires_at,
                    version,
                },
            );
        }
        if let Some(deadline) = expires_at {
            self.arm_value_expiry(key.to_string(), version, deadline);
        }
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool> {
        let version = self.next_version();
        let deadline = Instant::now() + ttl;
        let inserted = {
            let mut values = self.values.lock().unwrap();
            let now = Instant::now();
            let occupied = values
                .get(key)
                .map(|entry| entry.expires_at.map(|at| at > now).unwrap_or(true))
                .unwrap_or(false);
            if occupied {
                false
            } else {
                values.insert(
                    key.to_string(),
                    ValueEntry {
                        value: value.to_string(),
                        expires_at: Some(deadline),
                        version,
                    },
                );
                true
            }
        };
        if inserted {
            self.arm_value_expiry(key.to_string(), version, deadline);
        }
        Ok(inserted)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let now = Instant::now();
        let values = self.values.lock().unwrap();
        Ok(values.get(key).and_then(|entry| {
            if entry.expires_at.map(|at| at > now).unwrap_or(true) {
                Some(entry.value.clone())
            } else {
                None
            }
        }))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.values.lock().unwrap().remove(key);
        self.sets.lock().unwrap().remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        let version = self.next_version();
        let deadline = Instant::now() + ttl;

        {
            let mut values = self.values.lock().unwrap();
            if let Some(entry) = values.get_mut(key) {
                entry.expires_at = Some(deadline);
                entry.version = version;
                drop(values);
                self.arm_value_expiry(key.to_string(), version, deadline);
                return Ok(true);
            }
        }
        {
            let mut sets = self.sets.lock().unwrap();
            if let Some(entry) = sets.get_mut(key) {
                entry.expires_at = Some(deadline);
                entry.version = version;
                drop(sets);
                self.arm_set_expiry(key.to_string(), version, deadline);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let version = self.next_version();
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        {
            let mut sets = self.sets.lock().unwrap();
            let now = Instant::now();
            let entry = sets.entry(key.to_string()).or_insert_with(|| SetEntry {
                members: HashSet::new(),
                expires_at: None,
                version,
            });
            if entry.expires_at.map(|at| at <= now).unwrap_or(false) {
                entry.members.clear();
            }
            entry.members.insert(member.to_string());
            if expires_at.is_some() {
                entry.expires_at = expires_at;
                entry.version = version;
            }
        }
        if let Some(deadline) = expires_at {
            self.arm_set_expiry(key.to_string(), version, deadline);
        }
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> anyhow::Result<()> {
        let mut sets = self.sets.lock().unwrap();
        if let Some(entry) = sets.get_mut(key) {
            entry.members.remove(member);
        }
        Ok(())
    }

    async fn set_size(&self, key: &str) -> anyhow::Result<i64> {
        Ok(self.live_members(key).len() as i64)
    }

    async fn set_members(&self, key: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.live_members(key).into_iter().collect())
    }

    async fn sets_intersect(&self, first: &str, second: &str) -> anyhow::Result<bool> {
        let first = self.live_members(first);
        if first.is_empty() {
            return Ok(false);
        }
        let second = self.live_members(second);
        Ok(first.iter().any(|member| second.contains(member)))
    }

    fn expirations(&self) -> broadcast::Receiver<String> {
        self.expired_tx.subscribe()
    }
}

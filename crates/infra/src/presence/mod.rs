use crate::store::IKeyValueStore;
use chrono::{DateTime, Utc};
use sandglass_domain::{PresenceSession, ID};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// Layered TTLs: every family outlives the one it is derived from, so a
// crashed server leaves nothing behind once the longest TTL has passed.
// Active sessions refresh all of them on every heartbeat.
pub const ONLINE_USERS_TTL: Duration = Duration::from_secs(30 * 60);
pub const SERVER_USERS_TTL: Duration = Duration::from_secs(45 * 60);
pub const CONNECTED_SERVER_TTL: Duration = Duration::from_secs(60 * 60);
pub const SESSION_TTL: Duration = Duration::from_secs(120 * 60);

fn online_users_key(timer_id: &ID) -> String {
    format!("timer:{}:online_users", timer_id)
}

fn server_users_key(server_id: &str) -> String {
    format!("server:{}:users", server_id)
}

fn connected_server_key(user_id: &str) -> String {
    format!("user:{}:connected_server_id", user_id)
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

fn user_sessions_key(user_id: &str) -> String {
    format!("user:{}:sessions", user_id)
}

/// Who is watching which timer, and through which server.
///
/// All state lives in the shared store so any server can answer the relevance
/// question for any timer. Partial writes are not compensated; they decay via
/// their TTLs.
#[derive(Clone)]
pub struct PresenceIndex {
    store: Arc<dyn IKeyValueStore>,
}

impl PresenceIndex {
    pub fn new(store: Arc<dyn IKeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn record_connection(
        &self,
        timer_id: &ID,
        user_id: &str,
        server_id: &str,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let session = PresenceSession::new(session_id, timer_id.clone(), user_id, server_id, now);
        let session_json = serde_json::to_string(&session)?;

        self.store
            .set_add(&online_users_key(timer_id), user_id, Some(ONLINE_USERS_TTL))
            .await?;
        self.store
            .set_add(&server_users_key(server_id), user_id, Some(SERVER_USERS_TTL))
            .await?;
        self.store
            .set(
                &connected_server_key(user_id),
                server_id,
                Some(CONNECTED_SERVER_TTL),
            )
            .await?;
        self.store
            .set(&session_key(session_id), &session_json, Some(SESSION_TTL))
            .await?;
        self.store
            .set_add(&user_sessions_key(user_id), session_id, Some(SESSION_TTL))
            .await?;

        debug!(
            "Connection recorded: timer_id={}, user_id={}, server_id={}, session_id={}",
            timer_id, user_id, server_id, session_id
        );
        Ok(())
    }

    /// Reverses `record_connection` for one session. A session that already
    /// expired is a no-op.
    pub async fn remove_connection(
        &self,
        session_id: &str,
    ) -> anyhow::Result<Option<PresenceSession>> {
        let session = match self.session(session_id).await? {
            Some(session) => session,
            None => return Ok(None),
        };

        self.store
            .set_remove(&online_users_key(&session.timer_id), &session.user_id)
            .await?;
        self.store
            .set_remove(&server_users_key(&session.server_id), &session.user_id)
            .await?;
        self.store
            .delete(&connected_server_key(&session.user_id))
            .await?;
        self.store.delete(&session_key(session_id)).await?;
        self.store
            .set_remove(&user_sessions_key(&session.user_id), session_id)
            .await?;

        debug!(
            "Connection removed: timer_id={}, user_id={}, server_id={}",
            session.timer_id, session.user_id, session.server_id
        );
        Ok(Some(session))
    }

    /// Forced removal identified positionally, for operator tooling. Walks
    /// the user's session index to drop the matching sessions too.
    pub async fn remove_connection_forced(
        &self,
        timer_id: &ID,
        user_id: &str,
    ) -> anyhow::Result<()> {
        self.store
            .set_remove(&online_users_key(timer_id), user_id)
            .await?;

        if let Some(server_id) = self.store.get(&connected_server_key(user_id)).await? {
            self.store
                .set_remove(&server_users_key(&server_id), user_id)
                .await?;
        }
        self.store.delete(&connected_server_key(user_id)).await?;

        for session_id in self.store.set_members(&user_sessions_key(user_id)).await? {
            if let Some(session) = self.session(&session_id).await? {
                if session.timer_id == *timer_id {
                    self.store.delete(&session_key(&session_id)).await?;
                    self.store
                        .set_remove(&user_sessions_key(user_id), &session_id)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Refreshes every TTL tied to the session and bumps `last_heartbeat`.
    pub async fn heartbeat(&self, session_id: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut session = match self.session(session_id).await? {
            Some(session) => session,
            None => return Ok(()),
        };
        session.last_heartbeat = now;

        self.store
            .set(
                &session_key(session_id),
                &serde_json::to_string(&session)?,
                Some(SESSION_TTL),
            )
            .await?;
        self.store
            .expire(&online_users_key(&session.timer_id), ONLINE_USERS_TTL)
            .await?;
        self.store
            .expire(&server_users_key(&session.server_id), SERVER_USERS_TTL)
            .await?;
        self.store
            .set(
                &connected_server_key(&session.user_id),
                &session.server_id,
                Some(CONNECTED_SERVER_TTL),
            )
            .await?;
        self.store
            .expire(&user_sessions_key(&session.user_id), SESSION_TTL)
            .await?;
        Ok(())
    }

    /// The server-affinity filter: does this server have local viewers of
    /// this timer? One has-any intersection round trip; the hot path for
    /// every bus event on every server.
    pub async fn is_server_relevant(
        &self,
        timer_id: &ID,
        server_id: &str,
    ) -> anyhow::Result<bool> {
        self.store
            .sets_intersect(&online_users_key(timer_id), &server_users_key(server_id))
            .await
    }

    pub async fn online_count(&self, timer_id: &ID) -> anyhow::Result<i64> {
        self.store.set_size(&online_users_key(timer_id)).await
    }

    pub async fn online_users(&self, timer_id: &ID) -> anyhow::Result<Vec<String>> {
        self.store.set_members(&online_users_key(timer_id)).await
    }

    pub async fn connected_server(&self, user_id: &str) -> anyhow::Result<Option<String>> {
        self.store.get(&connected_server_key(user_id)).await
    }

    pub async fn session(&self, session_id: &str) -> anyhow::Result<Option<PresenceSession>> {
        match self.store.get(&session_key(session_id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Best-effort sweep on graceful shutdown: removes every session this
    /// server still holds so peers see the departures immediately instead of
    /// after TTL decay.
    pub async fn cleanup_server(&self, server_id: &str) -> anyhow::Result<()> {
        let users = self.store.set_members(&server_users_key(server_id)).await?;
        for user_id in users {
            for session_id in self.store.set_members(&user_sessions_key(&user_id)).await? {
                match self.session(&session_id).await {
                    Ok(Some(session)) if session.server_id == server_id => {
                        if let Err(e) = self.remove_connection(&session_id).await {
                            warn!("Shutdown cleanup failed for session {}: {}", session_id, e);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Shutdown cleanup failed for session {}: {}", session_id, e),
                }
            }
        }
        self.store.delete(&server_users_key(server_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKeyValueStore;

    fn index() -> PresenceIndex {
        PresenceIndex::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn record_then_remove_leaves_no_state() {
        let presence = index();
        let timer_id = ID::new();
        let now = Utc::now();

        presence
            .record_connection(&timer_id, "u1", "s1", "sess-1", now)
            .await
            .unwrap();
        assert_eq!(presence.online_count(&timer_id).await.unwrap(), 1);
        assert!(presence.is_server_relevant(&timer_id, "s1").await.unwrap());
        assert_eq!(
            presence.connected_server("u1").await.unwrap(),
            Some("s1".to_string())
        );

        let removed = presence.remove_connection("sess-1").await.unwrap().unwrap();
        assert_eq!(removed.user_id, "u1");

        assert_eq!(presence.online_count(&timer_id).await.unwrap(), 0);
        assert!(!presence.is_server_relevant(&timer_id, "s1").await.unwrap());
        assert_eq!(presence.connected_server("u1").await.unwrap(), None);
        assert_eq!(presence.session("sess-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn removing_a_missing_session_is_a_no_op() {
        let presence = index();
        assert!(presence
            .remove_connection("never-recorded")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn relevance_requires_a_viewer_on_that_server() {
        let presence = index();
        let timer_id = ID::new();
        let now = Utc::now();

        presence
            .record_connection(&timer_id, "u1", "s1", "sess-1", now)
            .await
            .unwrap();
        presence
            .record_connection(&timer_id, "u2", "s2", "sess-2", now)
            .await
            .unwrap();

        assert!(presence.is_server_relevant(&timer_id, "s1").await.unwrap());
        assert!(presence.is_server_relevant(&timer_id, "s2").await.unwrap());
        assert!(!presence.is_server_relevant(&timer_id, "s3").await.unwrap());
        assert_eq!(presence.online_count(&timer_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn forced_removal_by_timer_and_user() {
        let presence = index();
        let timer_id = ID::new();
        let other_timer = ID::new();
        let now = Utc::now();

        presence
            .record_connection(&timer_id, "u1", "s1", "sess-1", now)
            .await
            .unwrap();
        presence
            .record_connection(&other_timer, "u2", "s1", "sess-2", now)
            .await
            .unwrap();

        presence
            .remove_connection_forced(&timer_id, "u1")
            .await
            .unwrap();

        assert_eq!(presence.online_count(&timer_id).await.unwrap(), 0);
        assert_eq!(presence.session("sess-1").await.unwrap(), None);
        // The other user's session is untouched.
        assert!(presence.session("sess-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn heartbeat_updates_last_seen() {
        let presence = index();
        let timer_id = ID::new();
        let connected_at = Utc::now();

        presence
            .record_connection(&timer_id, "u1", "s1", "sess-1", connected_at)
            .await
            .unwrap();

        let later = connected_at + chrono::Duration::seconds(30);
        presence.heartbeat("sess-1", later).await.unwrap();

        let session = presence.session("sess-1").await.unwrap().unwrap();
        assert_eq!(session.last_heartbeat, later);
        assert_eq!(session.connected_at, connected_at);
    }

    #[tokio::test]
    async fn heartbeat_for_expired_session_is_a_no_op() {
        let presence = index();
        assert!(presence.heartbeat("gone", Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn server_cleanup_drops_only_that_servers_sessions() {
        let presence = index();
        let timer_id = ID::new();
        let now = Utc::now();

        presence
            .record_connection(&timer_id, "u1", "s1", "sess-1", now)
            .await
            .unwrap();
        presence
            .record_connection(&timer_id, "u2", "s2", "sess-2", now)
            .await
            .unwrap();

        presence.cleanup_server("s1").await.unwrap();

        assert_eq!(presence.online_count(&timer_id).await.unwrap(), 1);
        assert_eq!(presence.session("sess-1").await.unwrap(), None);
        assert!(presence.session("sess-2").await.unwrap().is_some());
        assert!(!presence.is_server_relevant(&timer_id, "s1").await.unwrap());
        assert!(presence.is_server_relevant(&timer_id, "s2").await.unwrap());
    }
}

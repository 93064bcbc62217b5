use crate::shared::entity::ID;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attributes of a live viewer session. Held only in the shared store with a
/// TTL; never persisted to primary storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSession {
    pub session_id: String,
    pub timer_id: ID,
    pub user_id: String,
    pub server_id: String,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

impl PresenceSession {
    pub fn new(
        session_id: &str,
        timer_id: ID,
        user_id: &str,
        server_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            timer_id,
            user_id: user_id.to_string(),
            server_id: server_id.to_string(),
            connected_at: now,
            last_heartbeat: now,
        }
    }
}

/// Derives a stable pseudo user id for sessions that connect without one.
pub fn derived_user_id(session_id: &str) -> String {
    let prefix: String = session_id.chars().take(8).collect();
    format!("user-{}", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_id_is_stable_per_session() {
        let a = derived_user_id("f81d4fae-7dec-11d0-a765-00a0c91e6bf6");
        let b = derived_user_id("f81d4fae-7dec-11d0-a765-00a0c91e6bf6");
        assert_eq!(a, b);
        assert_eq!(a, "user-f81d4fae");
    }

    #[test]
    fn short_session_ids_are_not_truncated_out() {
        assert_eq!(derived_user_id("abc"), "user-abc");
    }
}

use crate::event::TimerEvent;
use crate::shared::entity::{Entity, ID};
use chrono::{DateTime, Duration, Utc};

/// Days a dispatched-event record is retained before eviction.
pub const EVENT_LOG_RETENTION_DAYS: i64 = 365;

/// Append-only record of a bus event a server dispatched to its local
/// sessions.
#[derive(Debug, Clone)]
pub struct EventLog {
    pub id: ID,
    pub event_id: ID,
    pub timer_id: ID,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<String>,
    pub origin_server_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EventLog {
    pub fn from_event(event: &TimerEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: Default::default(),
            event_id: event.event_id().clone(),
            timer_id: event.timer_id().clone(),
            event_type: event.event_type().to_string(),
            timestamp: event.timestamp(),
            user_id: event.subject_user_id().map(|u| u.to_string()),
            origin_server_id: event.origin_server_id().to_string(),
            created_at: now,
            expires_at: now + Duration::days(EVENT_LOG_RETENTION_DAYS),
        }
    }
}

impl Entity<ID> for EventLog {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

use crate::shared::{entity::ID, metadata::Metadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical bus topics. Events are partitioned by `timer_id` within a topic so
/// per-timer ordering is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusTopic {
    TimerEvents,
    UserActions,
}

impl BusTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimerEvents => "timer-events",
            Self::UserActions => "user-actions",
        }
    }

    pub fn all() -> [BusTopic; 2] {
        [Self::TimerEvents, Self::UserActions]
    }
}

/// Every event that travels between servers or down to subscribed sessions.
///
/// The wire format is a tagged JSON object with a common envelope
/// (`eventId`, `timerId`, `timestamp`, `originServerId`) plus event-specific
/// payload. Dispatch is by explicit match on the variant, never by
/// introspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "eventType")]
pub enum TimerEvent {
    #[serde(rename = "TARGET_TIME_CHANGED")]
    #[serde(rename_all = "camelCase")]
    TargetTimeChanged {
        event_id: ID,
        timer_id: ID,
        timestamp: DateTime<Utc>,
        origin_server_id: String,
        old_target_time: Option<DateTime<Utc>>,
        new_target_time: DateTime<Utc>,
        changed_by: String,
    },
    #[serde(rename = "TIMESTAMP_SAVED")]
    #[serde(rename_all = "camelCase")]
    TimestampSaved {
        event_id: ID,
        timer_id: ID,
        timestamp: DateTime<Utc>,
        origin_server_id: String,
        user_id: String,
        saved_at: DateTime<Utc>,
        remaining_millis: i64,
        target_time: DateTime<Utc>,
        metadata: Metadata,
    },
    #[serde(rename = "USER_JOINED")]
    #[serde(rename_all = "camelCase")]
    UserJoined {
        event_id: ID,
        timer_id: ID,
        timestamp: DateTime<Utc>,
        origin_server_id: String,
        user_id: String,
        server_id: String,
    },
    #[serde(rename = "USER_LEFT")]
    #[serde(rename_all = "camelCase")]
    UserLeft {
        event_id: ID,
        timer_id: ID,
        timestamp: DateTime<Utc>,
        origin_server_id: String,
        user_id: String,
        server_id: String,
    },
    #[serde(rename = "TIMER_COMPLETED")]
    #[serde(rename_all = "camelCase")]
    TimerCompleted {
        event_id: ID,
        timer_id: ID,
        timestamp: DateTime<Utc>,
        origin_server_id: String,
        completed_target_time: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        owner_id: String,
        online_user_count: i64,
    },
    #[serde(rename = "SHARED_TIMER_ACCESSED")]
    #[serde(rename_all = "camelCase")]
    SharedTimerAccessed {
        event_id: ID,
        timer_id: ID,
        timestamp: DateTime<Utc>,
        origin_server_id: String,
        accessed_user_id: String,
        owner_id: String,
    },
    /// Local control message pushed straight to a server's own sessions.
    /// The presence index already knows the fleet-wide count, so this never
    /// travels over the bus.
    #[serde(rename = "ONLINE_USER_COUNT_UPDATED")]
    #[serde(rename_all = "camelCase")]
    OnlineUserCountUpdated {
        event_id: ID,
        timer_id: ID,
        timestamp: DateTime<Utc>,
        origin_server_id: String,
        online_user_count: i64,
    },
}

impl TimerEvent {
    pub fn event_id(&self) -> &ID {
        match self {
            Self::TargetTimeChanged { event_id, .. }
            | Self::TimestampSaved { event_id, .. }
            | Self::UserJoined { event_id, .. }
            | Self::UserLeft { event_id, .. }
            | Self::TimerCompleted { event_id, .. }
            | Self::SharedTimerAccessed { event_id, .. }
            | Self::OnlineUserCountUpdated { event_id, .. } => event_id,
        }
    }

    pub fn timer_id(&self) -> &ID {
        match self {
            Self::TargetTimeChanged { timer_id, .. }
            | Self::TimestampSaved { timer_id, .. }
            | Self::UserJoined { timer_id, .. }
            | Self::UserLeft { timer_id, .. }
            | Self::TimerCompleted { timer_id, .. }
            | Self::SharedTimerAccessed { timer_id, .. }
            | Self::OnlineUserCountUpdated { timer_id, .. } => timer_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::TargetTimeChanged { timestamp, .. }
            | Self::TimestampSaved { timestamp, .. }
            | Self::UserJoined { timestamp, .. }
            | Self::UserLeft { timestamp, .. }
            | Self::TimerCompleted { timestamp, .. }
            | Self::SharedTimerAccessed { timestamp, .. }
            | Self::OnlineUserCountUpdated { timestamp, .. } => *timestamp,
        }
    }

    pub fn origin_server_id(&self) -> &str {
        match self {
            Self::TargetTimeChanged {
                origin_server_id, ..
            }
            | Self::TimestampSaved {
                origin_server_id, ..
            }
            | Self::UserJoined {
                origin_server_id, ..
            }
            | Self::UserLeft {
                origin_server_id, ..
            }
            | Self::TimerCompleted {
                origin_server_id, ..
            }
            | Self::SharedTimerAccessed {
                origin_server_id, ..
            }
            | Self::OnlineUserCountUpdated {
                origin_server_id, ..
            } => origin_server_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TargetTimeChanged { .. } => "TARGET_TIME_CHANGED",
            Self::TimestampSaved { .. } => "TIMESTAMP_SAVED",
            Self::UserJoined { .. } => "USER_JOINED",
            Self::UserLeft { .. } => "USER_LEFT",
            Self::TimerCompleted { .. } => "TIMER_COMPLETED",
            Self::SharedTimerAccessed { .. } => "SHARED_TIMER_ACCESSED",
            Self::OnlineUserCountUpdated { .. } => "ONLINE_USER_COUNT_UPDATED",
        }
    }

    /// The user this event is about, when there is one. Stored alongside the
    /// event log for per-user auditing.
    pub fn subject_user_id(&self) -> Option<&str> {
        match self {
            Self::TargetTimeChanged { changed_by, .. } => Some(changed_by),
            Self::TimestampSaved { user_id, .. } => Some(user_id),
            Self::UserJoined { user_id, .. } | Self::UserLeft { user_id, .. } => Some(user_id),
            Self::SharedTimerAccessed {
                accessed_user_id, ..
            } => Some(accessed_user_id),
            Self::TimerCompleted { .. } | Self::OnlineUserCountUpdated { .. } => None,
        }
    }

    /// Which fleet topic this event travels on. `None` for local-only control
    /// messages.
    pub fn bus_topic(&self) -> Option<BusTopic> {
        match self {
            Self::TargetTimeChanged { .. }
            | Self::TimerCompleted { .. }
            | Self::SharedTimerAccessed { .. } => Some(BusTopic::TimerEvents),
            Self::TimestampSaved { .. } | Self::UserJoined { .. } | Self::UserLeft { .. } => {
                Some(BusTopic::UserActions)
            }
            Self::OnlineUserCountUpdated { .. } => None,
        }
    }

    /// Events every server dispatches without consulting the presence filter.
    /// The owner of a timer may be the only viewer on a server; completion
    /// and access notifications must still reach them.
    pub fn always_dispatch(&self) -> bool {
        matches!(
            self,
            Self::TargetTimeChanged { .. }
                | Self::TimerCompleted { .. }
                | Self::SharedTimerAccessed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_changed() -> TimerEvent {
        TimerEvent::TargetTimeChanged {
            event_id: ID::new(),
            timer_id: ID::new(),
            timestamp: Utc::now(),
            origin_server_id: "server-1".into(),
            old_target_time: None,
            new_target_time: Utc::now(),
            changed_by: "u1".into(),
        }
    }

    #[test]
    fn wire_format_is_tagged_and_camel_cased() {
        let event = target_changed();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "TARGET_TIME_CHANGED");
        assert!(json.get("newTargetTime").is_some());
        assert!(json.get("originServerId").is_some());
    }

    #[test]
    fn round_trips_through_json() {
        let event = TimerEvent::UserJoined {
            event_id: ID::new(),
            timer_id: ID::new(),
            timestamp: Utc::now(),
            origin_server_id: "server-2".into(),
            user_id: "u7".into(),
            server_id: "server-2".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: TimerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn topic_routing_splits_timer_and_user_events() {
        assert_eq!(target_changed().bus_topic(), Some(BusTopic::TimerEvents));

        let joined = TimerEvent::UserJoined {
            event_id: ID::new(),
            timer_id: ID::new(),
            timestamp: Utc::now(),
            origin_server_id: "s".into(),
            user_id: "u".into(),
            server_id: "s".into(),
        };
        assert_eq!(joined.bus_topic(), Some(BusTopic::UserActions));

        let count = TimerEvent::OnlineUserCountUpdated {
            event_id: ID::new(),
            timer_id: ID::new(),
            timestamp: Utc::now(),
            origin_server_id: "s".into(),
            online_user_count: 3,
        };
        assert_eq!(count.bus_topic(), None);
    }

    #[test]
    fn always_dispatch_covers_owner_notifications() {
        assert!(target_changed().always_dispatch());

        let left = TimerEvent::UserLeft {
            event_id: ID::new(),
            timer_id: ID::new(),
            timestamp: Utc::now(),
            origin_server_id: "s".into(),
            user_id: "u".into(),
            server_id: "s".into(),
        };
        assert!(!left.always_dispatch());
    }
}

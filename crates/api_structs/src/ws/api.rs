use chrono::{DateTime, Utc};
use sandglass_domain::{Metadata, ID};
use serde::{Deserialize, Serialize};

/// Frames a client publishes over its session. Server pushes are
/// `TimerEvent` envelopes tagged with `eventType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ClientCommand {
    /// Subscribe this session to a timer's live updates.
    #[serde(rename_all = "camelCase")]
    Subscribe { timer_id: ID },
    /// Append a timestamp mark at the current instant.
    #[serde(rename_all = "camelCase")]
    Save {
        timer_id: ID,
        target_time: DateTime<Utc>,
        #[serde(default)]
        metadata: Metadata,
    },
    /// Move the target instant (owner only).
    #[serde(rename_all = "camelCase")]
    ChangeTarget {
        timer_id: ID,
        new_target_time: DateTime<Utc>,
    },
    /// Force completion now (owner only).
    #[serde(rename_all = "camelCase")]
    Complete { timer_id: ID },
}

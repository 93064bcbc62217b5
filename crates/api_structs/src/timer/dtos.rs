use chrono::{DateTime, Utc};
use sandglass_domain::{Metadata, Timer, TimestampMark, UserRole, ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerDTO {
    pub timer_id: ID,
    pub user_id: Option<String>,
    pub owner_id: String,
    pub target_time: DateTime<Utc>,
    /// Server wall clock at response time; clients correct their local
    /// countdown against it.
    pub server_time: DateTime<Utc>,
    pub remaining_millis: i64,
    pub completed: bool,
    pub online_user_count: i64,
    pub share_token: String,
    pub user_role: String,
}

impl TimerDTO {
    pub fn new(
        timer: &Timer,
        user_id: Option<&str>,
        now: DateTime<Utc>,
        online_user_count: i64,
    ) -> Self {
        let role = user_id
            .map(|user_id| UserRole::of(timer, user_id))
            .unwrap_or(UserRole::Viewer);
        Self {
            timer_id: timer.id.clone(),
            user_id: user_id.map(|u| u.to_string()),
            owner_id: timer.owner_id.clone(),
            target_time: timer.target_time,
            server_time: now,
            remaining_millis: timer.remaining_millis(now),
            completed: timer.is_finished(now),
            online_user_count,
            share_token: timer.share_token.clone(),
            user_role: role.as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampMarkDTO {
    pub mark_id: ID,
    pub timer_id: ID,
    pub user_id: String,
    pub saved_at: DateTime<Utc>,
    pub remaining_millis: i64,
    pub target_at_save: DateTime<Utc>,
    pub metadata: Metadata,
}

impl TimestampMarkDTO {
    pub fn new(mark: TimestampMark) -> Self {
        Self {
            mark_id: mark.id.clone(),
            timer_id: mark.timer_id.clone(),
            user_id: mark.user_id.clone(),
            saved_at: mark.saved_at,
            remaining_millis: mark.remaining_millis,
            target_at_save: mark.target_at_save,
            metadata: mark.metadata,
        }
    }
}

use crate::shared::entity::{Entity, ID};
use chrono::{DateTime, Duration, Utc};
use sandglass_utils::create_random_secret;

/// Number of days a timer is retained after creation before the primary
/// store is allowed to evict it.
pub const TIMER_RETENTION_DAYS: i64 = 30;

/// A shared countdown timer. Viewers across the fleet subscribe to it and
/// receive live updates until `target_time` is reached.
///
/// Once `completed` is set the target time is frozen; further target changes
/// are rejected.
#[derive(Debug, Clone)]
pub struct Timer {
    pub id: ID,
    pub owner_id: String,
    pub target_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Opaque secondary identifier used in shareable URLs. Distinct from `id`
    /// so that share links are not enumerable.
    pub share_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Timer {
    pub fn new(owner_id: &str, target_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Default::default(),
            owner_id: owner_id.to_string(),
            target_time,
            created_at: now,
            updated_at: now,
            completed: false,
            completed_at: None,
            share_token: create_random_secret(32),
            expires_at: now + Duration::days(TIMER_RETENTION_DAYS),
        }
    }

    /// Remaining time in milliseconds, clamped at zero.
    pub fn remaining_millis(&self, now: DateTime<Utc>) -> i64 {
        (self.target_time - now).num_milliseconds().max(0)
    }

    /// Whether the timer should be presented as finished: either explicitly
    /// completed or past its target.
    pub fn is_finished(&self, now: DateTime<Utc>) -> bool {
        self.completed || self.target_time <= now
    }
}

impl Entity<ID> for Timer {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

/// Role of a user relative to a timer, echoed back in timer views so clients
/// can filter owner-only notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Owner,
    Viewer,
}

impl UserRole {
    pub fn of(timer: &Timer, user_id: &str) -> Self {
        if timer.owner_id == user_id {
            Self::Owner
        } else {
            Self::Viewer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Viewer => "VIEWER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_clamped_at_zero() {
        let now = Utc::now();
        let timer = Timer::new("u1", now - Duration::seconds(10), now);
        assert_eq!(timer.remaining_millis(now), 0);

        let timer = Timer::new("u1", now + Duration::seconds(10), now);
        assert_eq!(timer.remaining_millis(now), 10_000);
    }

    #[test]
    fn share_token_differs_from_id() {
        let now = Utc::now();
        let timer = Timer::new("u1", now + Duration::minutes(5), now);
        assert_ne!(timer.share_token, timer.id.as_string());
    }

    #[test]
    fn role_depends_on_ownership() {
        let now = Utc::now();
        let timer = Timer::new("owner", now + Duration::minutes(5), now);
        assert_eq!(UserRole::of(&timer, "owner"), UserRole::Owner);
        assert_eq!(UserRole::of(&timer, "someone-else"), UserRole::Viewer);
    }
}

use crate::shared::{
    entity::{Entity, ID},
    metadata::Metadata,
};
use chrono::{DateTime, Utc};

/// A snapshot of the countdown a user chose to record. Append-only and scoped
/// to a `(timer, user)` pair; saving never overwrites an earlier mark.
#[derive(Debug, Clone)]
pub struct TimestampMark {
    pub id: ID,
    pub timer_id: ID,
    pub user_id: String,
    pub saved_at: DateTime<Utc>,
    /// `max(0, target_at_save - saved_at)` in milliseconds.
    pub remaining_millis: i64,
    pub target_at_save: DateTime<Utc>,
    pub metadata: Metadata,
}

impl TimestampMark {
    pub fn new(
        timer_id: ID,
        user_id: &str,
        target_at_save: DateTime<Utc>,
        metadata: Metadata,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Default::default(),
            timer_id,
            user_id: user_id.to_string(),
            saved_at: now,
            remaining_millis: (target_at_save - now).num_milliseconds().max(0),
            target_at_save,
            metadata,
        }
    }
}

impl Entity<ID> for TimestampMark {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn remaining_never_negative() {
        let now = Utc::now();
        let mark = TimestampMark::new(
            Default::default(),
            "u1",
            now - Duration::seconds(3),
            Default::default(),
            now,
        );
        assert_eq!(mark.remaining_millis, 0);
    }

    #[test]
    fn remaining_matches_target_distance() {
        let now = Utc::now();
        let mark = TimestampMark::new(
            Default::default(),
            "u1",
            now + Duration::seconds(90),
            Default::default(),
            now,
        );
        assert_eq!(mark.remaining_millis, 90_000);
    }
}

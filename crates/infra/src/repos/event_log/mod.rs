mod inmemory;
mod postgres;

use sandglass_domain::{EventLog, ID};

pub use inmemory::InMemoryEventLogRepo;
pub use postgres::PostgresEventLogRepo;

#[async_trait::async_trait]
pub trait IEventLogRepo: Send + Sync {
    async fn insert(&self, log: &EventLog) -> anyhow::Result<()>;
    /// Most recent events for a timer, newest first.
    async fn find_by_timer(&self, timer_id: &ID, limit: i64) -> Vec<EventLog>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sandglass_domain::TimerEvent;

    #[tokio::test]
    async fn records_dispatched_events() {
        let repo = InMemoryEventLogRepo::new();
        let timer_id = ID::new();
        let now = Utc::now();

        for user in ["u1", "u2"].iter() {
            let event = TimerEvent::UserJoined {
                event_id: ID::new(),
                timer_id: timer_id.clone(),
                timestamp: now,
                origin_server_id: "s1".into(),
                user_id: user.to_string(),
                server_id: "s1".into(),
            };
            repo.insert(&EventLog::from_event(&event, now)).await.unwrap();
        }

        let logs = repo.find_by_timer(&timer_id, 10).await;
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.event_type == "USER_JOINED"));

        assert_eq!(repo.find_by_timer(&timer_id, 1).await.len(), 1);
    }
}

mod inmemory;
mod postgres;

use chrono::{DateTime, Utc};
use sandglass_domain::{Timer, ID};

pub use inmemory::InMemoryTimerRepo;
pub use postgres::PostgresTimerRepo;

#[async_trait::async_trait]
pub trait ITimerRepo: Send + Sync {
    async fn insert(&self, timer: &Timer) -> anyhow::Result<()>;
    async fn save(&self, timer: &Timer) -> anyhow::Result<()>;
    async fn find(&self, timer_id: &ID) -> Option<Timer>;
    async fn find_by_share_token(&self, share_token: &str) -> Option<Timer>;
    /// Incomplete timers whose target lies in `(window_start, before]`,
    /// scanned by the reconciliation monitor.
    async fn find_overdue(&self, before: DateTime<Utc>, window_start: DateTime<Utc>) -> Vec<Timer>;
    async fn delete(&self, timer_id: &ID) -> Option<Timer>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn crud_round_trip() {
        let repo = InMemoryTimerRepo::new();
        let now = Utc::now();
        let timer = Timer::new("u1", now + Duration::minutes(5), now);

        repo.insert(&timer).await.unwrap();
        let found = repo.find(&timer.id).await.expect("timer to exist");
        assert_eq!(found.owner_id, "u1");

        let by_token = repo
            .find_by_share_token(&timer.share_token)
            .await
            .expect("timer by token");
        assert_eq!(by_token.id, timer.id);

        let mut updated = timer.clone();
        updated.completed = true;
        repo.save(&updated).await.unwrap();
        assert!(repo.find(&timer.id).await.unwrap().completed);

        assert!(repo.delete(&timer.id).await.is_some());
        assert!(repo.find(&timer.id).await.is_none());
    }

    #[tokio::test]
    async fn overdue_scan_honours_the_window() {
        let repo = InMemoryTimerRepo::new();
        let now = Utc::now();

        let in_window = Timer::new("u1", now - Duration::minutes(2), now - Duration::minutes(10));
        let too_old = Timer::new("u1", now - Duration::minutes(30), now - Duration::hours(1));
        let future = Timer::new("u1", now + Duration::minutes(2), now);
        let mut done = Timer::new("u1", now - Duration::minutes(1), now - Duration::minutes(10));
        done.completed = true;

        for timer in [&in_window, &too_old, &future, &done].iter() {
            repo.insert(timer).await.unwrap();
        }

        let overdue = repo.find_overdue(now, now - Duration::minutes(5)).await;
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, in_window.id);
    }
}

mod inmemory;
mod postgres;

use chrono::{DateTime, Utc};
use sandglass_domain::{CompletionLog, CompletionStats, ID};

pub use inmemory::InMemoryCompletionLogRepo;
pub use postgres::PostgresCompletionLogRepo;

#[async_trait::async_trait]
pub trait ICompletionLogRepo: Send + Sync {
    async fn insert(&self, log: &CompletionLog) -> anyhow::Result<()>;
    async fn save(&self, log: &CompletionLog) -> anyhow::Result<()>;
    /// All attempts for a timer, oldest first.
    async fn find_by_timer(&self, timer_id: &ID) -> Vec<CompletionLog>;
    async fn exists_successful(&self, timer_id: &ID) -> anyhow::Result<bool>;
    async fn stats_since(&self, since: DateTime<Utc>) -> anyhow::Result<CompletionStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(timer_id: &ID, success: bool) -> CompletionLog {
        let now = Utc::now();
        let mut log = CompletionLog::new(timer_id.clone(), "s1", now, Some(now));
        log.mark_processing_started(now, true);
        if success {
            log.mark_success(now);
        } else {
            log.mark_failure(now, "boom");
        }
        log
    }

    #[tokio::test]
    async fn tracks_success_per_timer() {
        let repo = InMemoryCompletionLogRepo::new();
        let winner = ID::new();
        let loser = ID::new();

        repo.insert(&attempt(&winner, true)).await.unwrap();
        repo.insert(&attempt(&loser, false)).await.unwrap();

        assert!(repo.exists_successful(&winner).await.unwrap());
        assert!(!repo.exists_successful(&loser).await.unwrap());
        assert_eq!(repo.find_by_timer(&winner).await.len(), 1);
    }

    #[tokio::test]
    async fn save_updates_an_attempt_in_place() {
        let repo = InMemoryCompletionLogRepo::new();
        let timer_id = ID::new();
        let now = Utc::now();

        let mut log = CompletionLog::new(timer_id.clone(), "s1", now, Some(now));
        repo.insert(&log).await.unwrap();

        log.mark_processing_started(now, true);
        log.mark_success(now);
        repo.save(&log).await.unwrap();

        let logs = repo.find_by_timer(&timer_id).await;
        assert_eq!(logs.len(), 1);
        assert!(logs[0].success);
        assert!(logs[0].lock_acquired);
    }

    #[tokio::test]
    async fn stats_aggregate_a_window() {
        let repo = InMemoryCompletionLogRepo::new();
        let timer_id = ID::new();
        let since = Utc::now() - chrono::Duration::hours(1);

        repo.insert(&attempt(&timer_id, true)).await.unwrap();
        repo.insert(&attempt(&timer_id, false)).await.unwrap();
        repo.insert(&attempt(&timer_id, false)).await.unwrap();

        let stats = repo.stats_since(since).await.unwrap();
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.successful_completions, 1);
        assert_eq!(stats.failed_attempts, 2);
    }
}

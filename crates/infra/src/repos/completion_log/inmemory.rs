use super::ICompletionLogRepo;
use crate::repos::shared::inmemory_repo::*;
use chrono::{DateTime, Utc};
use sandglass_domain::{CompletionLog, CompletionStats, ID};
use std::sync::Mutex;

pub struct InMemoryCompletionLogRepo {
    logs: Mutex<Vec<CompletionLog>>,
}

impl InMemoryCompletionLogRepo {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl ICompletionLogRepo for InMemoryCompletionLogRepo {
    async fn insert(&self, log: &CompletionLog) -> anyhow::Result<()> {
        insert(log, &self.logs);
        Ok(())
    }

    async fn save(&self, log: &CompletionLog) -> anyhow::Result<()> {
        save(log, &self.logs);
        Ok(())
    }

    async fn find_by_timer(&self, timer_id: &ID) -> Vec<CompletionLog> {
        let mut logs = find_by(&self.logs, |l| l.timer_id == *timer_id);
        logs.sort_by_key(|l| l.created_at);
        logs
    }

    async fn exists_successful(&self, timer_id: &ID) -> anyhow::Result<bool> {
        Ok(!find_by(&self.logs, |l| l.timer_id == *timer_id && l.success).is_empty())
    }

    async fn stats_since(&self, since: DateTime<Utc>) -> anyhow::Result<CompletionStats> {
        let window = find_by(&self.logs, |l| l.created_at >= since);
        let total = window.len() as i64;
        let successful = window.iter().filter(|l| l.success).count() as i64;
        Ok(CompletionStats::new(total, successful, total - successful))
    }
}

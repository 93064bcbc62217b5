use super::IEventLogRepo;
use crate::repos::shared::inmemory_repo::*;
use sandglass_domain::{EventLog, ID};
use std::sync::Mutex;

pub struct InMemoryEventLogRepo {
    logs: Mutex<Vec<EventLog>>,
}

impl InMemoryEventLogRepo {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl IEventLogRepo for InMemoryEventLogRepo {
    async fn insert(&self, log: &EventLog) -> anyhow::Result<()> {
        insert(log, &self.logs);
        Ok(())
    }

    async fn find_by_timer(&self, timer_id: &ID, limit: i64) -> Vec<EventLog> {
        let mut logs = find_by(&self.logs, |l| l.timer_id == *timer_id);
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        logs.truncate(limit as usize);
        logs
    }
}

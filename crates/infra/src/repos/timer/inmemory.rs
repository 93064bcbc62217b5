use super::ITimerRepo;
use crate::repos::shared::inmemory_repo::*;
use chrono::{DateTime, Utc};
use sandglass_domain::{Timer, ID};
use std::sync::Mutex;

pub struct InMemoryTimerRepo {
    timers: Mutex<Vec<Timer>>,
}

impl InMemoryTimerRepo {
    pub fn new() -> Self {
        Self {
            timers: Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl ITimerRepo for InMemoryTimerRepo {
    async fn insert(&self, timer: &Timer) -> anyhow::Result<()> {
        insert(timer, &self.timers);
        Ok(())
    }

    async fn save(&self, timer: &Timer) -> anyhow::Result<()> {
        save(timer, &self.timers);
        Ok(())
    }

    async fn find(&self, timer_id: &ID) -> Option<Timer> {
        find(timer_id, &self.timers)
    }

    async fn find_by_share_token(&self, share_token: &str) -> Option<Timer> {
        let mut timers = find_by(&self.timers, |t| t.share_token == share_token);
        if timers.is_empty() {
            return None;
        }
        Some(timers.remove(0))
    }

    async fn find_overdue(&self, before: DateTime<Utc>, window_start: DateTime<Utc>) -> Vec<Timer> {
        find_by(&self.timers, |t| {
            !t.completed && t.target_time <= before && t.target_time > window_start
        })
    }

    async fn delete(&self, timer_id: &ID) -> Option<Timer> {
        delete(timer_id, &self.timers)
    }
}

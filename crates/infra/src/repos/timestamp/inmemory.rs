use super::ITimestampRepo;
use crate::repos::shared::inmemory_repo::*;
use sandglass_domain::{TimestampMark, ID};
use std::sync::Mutex;

pub struct InMemoryTimestampRepo {
    marks: Mutex<Vec<TimestampMark>>,
}

impl InMemoryTimestampRepo {
    pub fn new() -> Self {
        Self {
            marks: Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl ITimestampRepo for InMemoryTimestampRepo {
    async fn insert(&self, mark: &TimestampMark) -> anyhow::Result<()> {
        insert(mark, &self.marks);
        Ok(())
    }

    async fn find_by_timer(&self, timer_id: &ID) -> Vec<TimestampMark> {
        let mut marks = find_by(&self.marks, |m| m.timer_id == *timer_id);
        marks.sort_by_key(|m| m.saved_at);
        marks
    }

    async fn find_by_timer_and_user(&self, timer_id: &ID, user_id: &str) -> Vec<TimestampMark> {
        let mut marks = find_by(&self.marks, |m| {
            m.timer_id == *timer_id && m.user_id == user_id
        });
        marks.sort_by_key(|m| m.saved_at);
        marks
    }
}

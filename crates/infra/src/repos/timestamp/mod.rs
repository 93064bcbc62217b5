mod inmemory;
mod postgres;

use sandglass_domain::{TimestampMark, ID};

pub use inmemory::InMemoryTimestampRepo;
pub use postgres::PostgresTimestampRepo;

#[async_trait::async_trait]
pub trait ITimestampRepo: Send + Sync {
    async fn insert(&self, mark: &TimestampMark) -> anyhow::Result<()>;
    /// All marks for a timer, oldest first.
    async fn find_by_timer(&self, timer_id: &ID) -> Vec<TimestampMark>;
    /// One user's marks for a timer, oldest first.
    async fn find_by_timer_and_user(&self, timer_id: &ID, user_id: &str) -> Vec<TimestampMark>;
}

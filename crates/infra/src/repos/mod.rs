mod completion_log;
mod event_log;
mod shared;
mod timer;
mod timestamp;

use completion_log::{InMemoryCompletionLogRepo, PostgresCompletionLogRepo};
use event_log::{InMemoryEventLogRepo, PostgresEventLogRepo};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use timer::{InMemoryTimerRepo, PostgresTimerRepo};
use timestamp::{InMemoryTimestampRepo, PostgresTimestampRepo};
use tracing::info;

pub use completion_log::ICompletionLogRepo;
pub use event_log::IEventLogRepo;
pub use timer::ITimerRepo;
pub use timestamp::ITimestampRepo;

#[derive(Clone)]
pub struct Repos {
    pub timers: Arc<dyn ITimerRepo>,
    pub timestamps: Arc<dyn ITimestampRepo>,
    pub completion_logs: Arc<dyn ICompletionLogRepo>,
    pub event_logs: Arc<dyn IEventLogRepo>,
}

impl Repos {
    pub async fn create_postgres(connection_string: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await?;

        info!("DB CHECKING CONNECTION AND RUNNING MIGRATIONS ...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("DB CHECKING CONNECTION AND RUNNING MIGRATIONS ... [done]");

        Ok(Self {
            timers: Arc::new(PostgresTimerRepo::new(pool.clone())),
            timestamps: Arc::new(PostgresTimestampRepo::new(pool.clone())),
            completion_logs: Arc::new(PostgresCompletionLogRepo::new(pool.clone())),
            event_logs: Arc::new(PostgresEventLogRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        Self {
            timers: Arc::new(InMemoryTimerRepo::new()),
            timestamps: Arc::new(InMemoryTimestampRepo::new()),
            completion_logs: Arc::new(InMemoryCompletionLogRepo::new()),
            event_logs: Arc::new(InMemoryEventLogRepo::new()),
        }
    }
}

use super::IEventLogRepo;
use chrono::{DateTime, Utc};
use sandglass_domain::{EventLog, ID};
use sqlx::{types::Uuid, FromRow, PgPool};

pub struct PostgresEventLogRepo {
    pool: PgPool,
}

impl PostgresEventLogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EventLogRaw {
    log_uid: Uuid,
    event_uid: Uuid,
    timer_uid: Uuid,
    event_type: String,
    occurred_at: DateTime<Utc>,
    user_id: Option<String>,
    origin_server_id: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<EventLogRaw> for EventLog {
    fn from(raw: EventLogRaw) -> Self {
        Self {
            id: raw.log_uid.into(),
            event_id: raw.event_uid.into(),
            timer_id: raw.timer_uid.into(),
            event_type: raw.event_type,
            timestamp: raw.occurred_at,
            user_id: raw.user_id,
            origin_server_id: raw.origin_server_id,
            created_at: raw.created_at,
            expires_at: raw.expires_at,
        }
    }
}

#[async_trait::async_trait]
impl IEventLogRepo for PostgresEventLogRepo {
    async fn insert(&self, log: &EventLog) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO timer_event_logs
            (log_uid, event_uid, timer_uid, event_type, occurred_at, user_id, origin_server_id,
             created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.id.inner_ref())
        .bind(log.event_id.inner_ref())
        .bind(log.timer_id.inner_ref())
        .bind(&log.event_type)
        .bind(log.timestamp)
        .bind(&log.user_id)
        .bind(&log.origin_server_id)
        .bind(log.created_at)
        .bind(log.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_timer(&self, timer_id: &ID, limit: i64) -> Vec<EventLog> {
        sqlx::query_as::<_, EventLogRaw>(
            r#"
            SELECT * FROM timer_event_logs AS l
            WHERE l.timer_uid = $1
            ORDER BY l.occurred_at DESC
            LIMIT $2
            "#,
        )
        .bind(timer_id.inner_ref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|l| l.into())
        .collect()
    }
}

use super::ICompletionLogRepo;
use chrono::{DateTime, Utc};
use sandglass_domain::{CompletionLog, CompletionStats, ID};
use sqlx::{types::Uuid, FromRow, PgPool, Row};

pub struct PostgresCompletionLogRepo {
    pool: PgPool,
}

impl PostgresCompletionLogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CompletionLogRaw {
    log_uid: Uuid,
    timer_uid: Uuid,
    server_id: String,
    notification_received_at: DateTime<Utc>,
    processing_started_at: Option<DateTime<Utc>>,
    processing_completed_at: Option<DateTime<Utc>>,
    lock_acquired: bool,
    success: bool,
    error_message: Option<String>,
    original_target_time: Option<DateTime<Utc>>,
    processing_delay_millis: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<CompletionLogRaw> for CompletionLog {
    fn from(raw: CompletionLogRaw) -> Self {
        Self {
            id: raw.log_uid.into(),
            timer_id: raw.timer_uid.into(),
            server_id: raw.server_id,
            notification_received_at: raw.notification_received_at,
            processing_started_at: raw.processing_started_at,
            processing_completed_at: raw.processing_completed_at,
            lock_acquired: raw.lock_acquired,
            success: raw.success,
            error_message: raw.error_message,
            original_target_time: raw.original_target_time,
            processing_delay_millis: raw.processing_delay_millis,
            created_at: raw.created_at,
        }
    }
}

#[async_trait::async_trait]
impl ICompletionLogRepo for PostgresCompletionLogRepo {
    async fn insert(&self, log: &CompletionLog) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO timer_completion_logs
            (log_uid, timer_uid, server_id, notification_received_at, processing_started_at,
             processing_completed_at, lock_acquired, success, error_message, original_target_time,
             processing_delay_millis, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(log.id.inner_ref())
        .bind(log.timer_id.inner_ref())
        .bind(&log.server_id)
        .bind(log.notification_received_at)
        .bind(log.processing_started_at)
        .bind(log.processing_completed_at)
        .bind(log.lock_acquired)
        .bind(log.success)
        .bind(&log.error_message)
        .bind(log.original_target_time)
        .bind(log.processing_delay_millis)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save(&self, log: &CompletionLog) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE timer_completion_logs SET
            processing_started_at = $2, processing_completed_at = $3, lock_acquired = $4,
            success = $5, error_message = $6, processing_delay_millis = $7
            WHERE log_uid = $1
            "#,
        )
        .bind(log.id.inner_ref())
        .bind(log.processing_started_at)
        .bind(log.processing_completed_at)
        .bind(log.lock_acquired)
        .bind(log.success)
        .bind(&log.error_message)
        .bind(log.processing_delay_millis)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_timer(&self, timer_id: &ID) -> Vec<CompletionLog> {
        sqlx::query_as::<_, CompletionLogRaw>(
            r#"
            SELECT * FROM timer_completion_logs AS l
            WHERE l.timer_uid = $1
            ORDER BY l.created_at ASC
            "#,
        )
        .bind(timer_id.inner_ref())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|l| l.into())
        .collect()
    }

    async fn exists_successful(&self, timer_id: &ID) -> anyhow::Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM timer_completion_logs AS l
                WHERE l.timer_uid = $1 AND l.success = true
            ) AS found
            "#,
        )
        .bind(timer_id.inner_ref())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get::<bool, _>("found")?)
    }

    async fn stats_since(&self, since: DateTime<Utc>) -> anyhow::Result<CompletionStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE l.success = true) AS successful,
                COUNT(*) FILTER (WHERE l.success = false) AS failed
            FROM timer_completion_logs AS l
            WHERE l.created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(CompletionStats::new(
            row.try_get::<i64, _>("total")?,
            row.try_get::<i64, _>("successful")?,
            row.try_get::<i64, _>("failed")?,
        ))
    }
}

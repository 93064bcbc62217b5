use super::ITimerRepo;
use chrono::{DateTime, Utc};
use sandglass_domain::{Timer, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;

pub struct PostgresTimerRepo {
    pool: PgPool,
}

impl PostgresTimerRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TimerRaw {
    timer_uid: Uuid,
    owner_id: String,
    target_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    share_token: String,
    expires_at: DateTime<Utc>,
}

impl From<TimerRaw> for Timer {
    fn from(raw: TimerRaw) -> Self {
        Self {
            id: raw.timer_uid.into(),
            owner_id: raw.owner_id,
            target_time: raw.target_time,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            completed: raw.completed,
            completed_at: raw.completed_at,
            share_token: raw.share_token,
            expires_at: raw.expires_at,
        }
    }
}

#[async_trait::async_trait]
impl ITimerRepo for PostgresTimerRepo {
    async fn insert(&self, timer: &Timer) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO timers
            (timer_uid, owner_id, target_time, created_at, updated_at, completed, completed_at, share_token, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(timer.id.inner_ref())
        .bind(&timer.owner_id)
        .bind(timer.target_time)
        .bind(timer.created_at)
        .bind(timer.updated_at)
        .bind(timer.completed)
        .bind(timer.completed_at)
        .bind(&timer.share_token)
        .bind(timer.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save(&self, timer: &Timer) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE timers SET
            target_time = $2, updated_at = $3, completed = $4, completed_at = $5
            WHERE timer_uid = $1
            "#,
        )
        .bind(timer.id.inner_ref())
        .bind(timer.target_time)
        .bind(timer.updated_at)
        .bind(timer.completed)
        .bind(timer.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, timer_id: &ID) -> Option<Timer> {
        match sqlx::query_as::<_, TimerRaw>(
            r#"
            SELECT * FROM timers AS t
            WHERE t.timer_uid = $1
            "#,
        )
        .bind(timer_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        {
            Ok(timer) => timer.map(|t| t.into()),
            Err(e) => {
                error!("Find timer {} failed: {:?}", timer_id, e);
                None
            }
        }
    }

    async fn find_by_share_token(&self, share_token: &str) -> Option<Timer> {
        match sqlx::query_as::<_, TimerRaw>(
            r#"
            SELECT * FROM timers AS t
            WHERE t.share_token = $1
            "#,
        )
        .bind(share_token)
        .fetch_optional(&self.pool)
        .await
        {
            Ok(timer) => timer.map(|t| t.into()),
            Err(e) => {
                error!("Find timer by share token failed: {:?}", e);
                None
            }
        }
    }

    async fn find_overdue(&self, before: DateTime<Utc>, window_start: DateTime<Utc>) -> Vec<Timer> {
        sqlx::query_as::<_, TimerRaw>(
            r#"
            SELECT * FROM timers AS t
            WHERE t.completed = false AND
            t.target_time <= $1 AND
            t.target_time > $2
            "#,
        )
        .bind(before)
        .bind(window_start)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.into())
        .collect()
    }

    async fn delete(&self, timer_id: &ID) -> Option<Timer> {
        match sqlx::query_as::<_, TimerRaw>(
            r#"
            DELETE FROM timers AS t
            WHERE t.timer_uid = $1
            RETURNING *
            "#,
        )
        .bind(timer_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        {
            Ok(timer) => timer.map(|t| t.into()),
            Err(e) => {
                error!("Delete timer {} failed: {:?}", timer_id, e);
                None
            }
        }
    }
}

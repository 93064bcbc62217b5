use super::ITimestampRepo;
use chrono::{DateTime, Utc};
use sandglass_domain::{Metadata, TimestampMark, ID};
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use std::collections::HashMap;

pub struct PostgresTimestampRepo {
    pool: PgPool,
}

impl PostgresTimestampRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TimestampMarkRaw {
    mark_uid: Uuid,
    timer_uid: Uuid,
    user_id: String,
    saved_at: DateTime<Utc>,
    remaining_millis: i64,
    target_at_save: DateTime<Utc>,
    metadata: Json<HashMap<String, String>>,
}

impl From<TimestampMarkRaw> for TimestampMark {
    fn from(raw: TimestampMarkRaw) -> Self {
        Self {
            id: raw.mark_uid.into(),
            timer_id: raw.timer_uid.into(),
            user_id: raw.user_id,
            saved_at: raw.saved_at,
            remaining_millis: raw.remaining_millis,
            target_at_save: raw.target_at_save,
            metadata: Metadata::from(raw.metadata.0),
        }
    }
}

#[async_trait::async_trait]
impl ITimestampRepo for PostgresTimestampRepo {
    async fn insert(&self, mark: &TimestampMark) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO timestamp_marks
            (mark_uid, timer_uid, user_id, saved_at, remaining_millis, target_at_save, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(mark.id.inner_ref())
        .bind(mark.timer_id.inner_ref())
        .bind(&mark.user_id)
        .bind(mark.saved_at)
        .bind(mark.remaining_millis)
        .bind(mark.target_at_save)
        .bind(Json(mark.metadata.inner.clone()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_timer(&self, timer_id: &ID) -> Vec<TimestampMark> {
        sqlx::query_as::<_, TimestampMarkRaw>(
            r#"
            SELECT * FROM timestamp_marks AS m
            WHERE m.timer_uid = $1
            ORDER BY m.saved_at ASC
            "#,
        )
        .bind(timer_id.inner_ref())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|m| m.into())
        .collect()
    }

    async fn find_by_timer_and_user(&self, timer_id: &ID, user_id: &str) -> Vec<TimestampMark> {
        sqlx::query_as::<_, TimestampMarkRaw>(
            r#"
            SELECT * FROM timestamp_marks AS m
            WHERE m.timer_uid = $1 AND m.user_id = $2
            ORDER BY m.saved_at ASC
            "#,
        )
        .bind(timer_id.inner_ref())
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|m| m.into())
        .collect()
    }
}

use super::IKeyValueStore;
use anyhow::Context;
use futures::StreamExt;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, warn};

/// Redis-backed store. Key expiry events arrive through keyspace
/// notifications (`notify-keyspace-events Ex`), which are pub/sub broadcasts:
/// every server subscribed to the pattern sees every expired key.
pub struct RedisKeyValueStore {
    conn: ConnectionManager,
    expired_tx: broadcast::Sender<String>,
}

impl RedisKeyValueStore {
    pub async fn connect(uri: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(uri).context("Invalid redis uri")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("Could not connect to redis")?;

        let mut config_conn = conn.clone();
        if let Err(e) = redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg("Ex")
            .query_async::<_, ()>(&mut config_conn)
            .await
        {
            warn!(
                "Could not enable keyspace notifications ({}). \
                 Set `notify-keyspace-events Ex` on the redis server manually.",
                e
            );
        }

        let (expired_tx, _) = broadcast::channel(1024);
        let tx = expired_tx.clone();
        tokio::spawn(async move {
            loop {
                match client.get_async_pubsub().await {
                    Ok(mut pubsub) => {
                        if let Err(e) = pubsub.psubscribe("__keyevent@*__:expired").await {
                            error!("Could not subscribe to key expiry events: {}", e);
                        } else {
                            let mut messages = pubsub.on_message();
                            while let Some(msg) = messages.next().await {
                                match msg.get_payload::<String>() {
                                    Ok(key) => {
                                        let _ = tx.send(key);
                                    }
                                    Err(e) => warn!("Malformed expiry notification: {}", e),
                                }
                            }
                        }
                    }
                    Err(e) => error!("Redis pubsub connection failed: {}", e),
                }
                warn!("Redis expiry subscription lost. Reconnecting ...");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });

        Ok(Self { conn, expired_tx })
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for RedisKeyValueStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl.as_millis() as u64)
                    .query_async::<_, ()>(&mut conn)
                    .await?
            }
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.pexpire(key, ttl.as_millis() as i64).await?)
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(key, member).await?;
        if let Some(ttl) = ttl {
            conn.pexpire::<_, bool>(key, ttl.as_millis() as i64).await?;
        }
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.srem::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn set_size(&self, key: &str) -> anyhow::Result<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.scard(key).await?)
    }

    async fn set_members(&self, key: &str) -> anyhow::Result<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.smembers(key).await?)
    }

    async fn sets_intersect(&self, first: &str, second: &str) -> anyhow::Result<bool> {
        // SINTERCARD with LIMIT 1 answers has-any without materializing the
        // intersection.
        let mut conn = self.conn.clone();
        let count: i64 = redis::cmd("SINTERCARD")
            .arg(2)
            .arg(first)
            .arg(second)
            .arg("LIMIT")
            .arg(1)
            .query_async(&mut conn)
            .await?;
        Ok(count > 0)
    }

    fn expirations(&self) -> broadcast::Receiver<String> {
        self.expired_tx.subscribe()
    }
}

use super::IEventBus;
use anyhow::{anyhow, Context};
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
    Message,
};
use sandglass_domain::{BusTopic, TimerEvent};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Kafka-backed fleet bus.
///
/// Each server instance runs its consumers in a consumer group of its own
/// (`sandglass-{topic}-{server id}`), so every partition of every topic is
/// delivered to every server. The per-server presence filter, not the broker,
/// decides which events matter locally.
pub struct KafkaEventBus {
    producer: FutureProducer,
    timer_events: broadcast::Sender<TimerEvent>,
    user_actions: broadcast::Sender<TimerEvent>,
}

impl KafkaEventBus {
    pub fn connect(bootstrap_servers: &str, server_instance_id: &str) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("message.timeout.ms", "5000")
            .set(
                "client.id",
                format!("sandglass-producer-{}", server_instance_id),
            )
            .create()
            .context("Could not create kafka producer")?;

        let (timer_events, _) = broadcast::channel(1024);
        let (user_actions, _) = broadcast::channel(1024);

        for topic in BusTopic::all().iter() {
            let tx = match topic {
                BusTopic::TimerEvents => timer_events.clone(),
                BusTopic::UserActions => user_actions.clone(),
            };
            Self::start_consumer(bootstrap_servers, server_instance_id, *topic, tx)?;
        }

        Ok(Self {
            producer,
            timer_events,
            user_actions,
        })
    }

    fn start_consumer(
        bootstrap_servers: &str,
        server_instance_id: &str,
        topic: BusTopic,
        tx: broadcast::Sender<TimerEvent>,
    ) -> anyhow::Result<()> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set(
                "group.id",
                format!("sandglass-{}-{}", topic.as_str(), server_instance_id),
            )
            .set(
                "client.id",
                format!("sandglass-consumer-{}", server_instance_id),
            )
            .set("auto.offset.reset", "latest")
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "1000")
            .set("session.timeout.ms", "6000")
            .create()
            .context("Could not create kafka consumer")?;

        consumer
            .subscribe(&[topic.as_str()])
            .with_context(|| format!("Could not subscribe to topic {}", topic.as_str()))?;

        tokio::spawn(async move {
            loop {
                match consumer.recv().await {
                    Ok(message) => {
                        let payload = match message.payload() {
                            Some(payload) => payload,
                            None => continue,
                        };
                        match serde_json::from_slice::<TimerEvent>(payload) {
                            Ok(event) => {
                                debug!(
                                    "Received {} for timer {} (partition {}, offset {})",
                                    event.event_type(),
                                    event.timer_id(),
                                    message.partition(),
                                    message.offset()
                                );
                                let _ = tx.send(event);
                            }
                            Err(e) => warn!("Dropping undecodable bus message: {}", e),
                        }
                    }
                    Err(e) => {
                        error!("Kafka consumer error on {}: {}", topic.as_str(), e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl IEventBus for KafkaEventBus {
    async fn publish(&self, event: &TimerEvent) -> anyhow::Result<()> {
        let topic = event
            .bus_topic()
            .ok_or_else(|| anyhow!("{} is a local-only event", event.event_type()))?;
        let key = event.timer_id().as_string();
        let payload = serde_json::to_string(event)?;

        let record = FutureRecord::to(topic.as_str()).key(&key).payload(&payload);
        self.producer
            .send(record, Timeout::After(PUBLISH_TIMEOUT))
            .await
            .map_err(|(e, _)| anyhow!("Kafka publish failed: {}", e))?;

        debug!(
            "Published {} for timer {} on {}",
            event.event_type(),
            event.timer_id(),
            topic.as_str()
        );
        Ok(())
    }

    fn subscribe(&self, topic: BusTopic) -> broadcast::Receiver<TimerEvent> {
        match topic {
            BusTopic::TimerEvents => self.timer_events.subscribe(),
            BusTopic::UserActions => self.user_actions.subscribe(),
        }
    }
}

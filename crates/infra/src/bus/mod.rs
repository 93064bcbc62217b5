mod inmemory;
mod kafka;

use sandglass_domain::{BusTopic, TimerEvent};
use tokio::sync::broadcast;

pub use inmemory::InMemoryEventBus;
pub use kafka::KafkaEventBus;

/// Durable, partitioned pub/sub binding the fleet together.
///
/// Events are keyed on `timer_id`, so delivery order per timer matches
/// publish order. Every server consumes every event (broadcast, not
/// work-stealing) and filters independently through the presence index.
#[async_trait::async_trait]
pub trait IEventBus: Send + Sync {
    async fn publish(&self, event: &TimerEvent) -> anyhow::Result<()>;

    /// Subscribes to one logical topic. Each receiver sees every event
    /// published to that topic fleet-wide.
    fn subscribe(&self, topic: BusTopic) -> broadcast::Receiver<TimerEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sandglass_domain::ID;
    use std::time::Duration;
    use tokio::time::timeout;

    fn user_joined(timer_id: &ID) -> TimerEvent {
        TimerEvent::UserJoined {
            event_id: ID::new(),
            timer_id: timer_id.clone(),
            timestamp: Utc::now(),
            origin_server_id: "s1".into(),
            user_id: "u1".into(),
            server_id: "s1".into(),
        }
    }

    #[tokio::test]
    async fn subscribers_of_the_topic_receive_published_events() {
        let bus = InMemoryEventBus::new();
        let mut user_actions = bus.subscribe(BusTopic::UserActions);
        let mut timer_events = bus.subscribe(BusTopic::TimerEvents);

        let timer_id = ID::new();
        bus.publish(&user_joined(&timer_id)).await.unwrap();

        let received = timeout(Duration::from_secs(1), user_actions.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.timer_id(), &timer_id);
        assert!(timer_events.try_recv().is_err());
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event() {
        let bus = InMemoryEventBus::new();
        let mut first = bus.subscribe(BusTopic::UserActions);
        let mut second = bus.subscribe(BusTopic::UserActions);

        bus.publish(&user_joined(&ID::new())).await.unwrap();

        assert!(first.try_recv().is_ok());
        assert!(second.try_recv().is_ok());
    }

    #[tokio::test]
    async fn local_only_events_are_rejected() {
        let bus = InMemoryEventBus::new();
        let event = TimerEvent::OnlineUserCountUpdated {
            event_id: ID::new(),
            timer_id: ID::new(),
            timestamp: Utc::now(),
            origin_server_id: "s1".into(),
            online_user_count: 1,
        };
        assert!(bus.publish(&event).await.is_err());
    }
}

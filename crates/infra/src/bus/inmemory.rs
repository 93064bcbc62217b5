use super::IEventBus;
use anyhow::anyhow;
use sandglass_domain::{BusTopic, TimerEvent};
use tokio::sync::broadcast;

/// Single-process bus used by tests and local runs. Broadcast channels give
/// the same every-server-sees-every-event semantics the fleet relies on.
pub struct InMemoryEventBus {
    timer_events: broadcast::Sender<TimerEvent>,
    user_actions: broadcast::Sender<TimerEvent>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        let (timer_events, _) = broadcast::channel(1024);
        let (user_actions, _) = broadcast::channel(1024);
        Self {
            timer_events,
            user_actions,
        }
    }

    fn sender(&self, topic: BusTopic) -> &broadcast::Sender<TimerEvent> {
        match topic {
            BusTopic::TimerEvents => &self.timer_events,
            BusTopic::UserActions => &self.user_actions,
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IEventBus for InMemoryEventBus {
    async fn publish(&self, event: &TimerEvent) -> anyhow::Result<()> {
        let topic = event
            .bus_topic()
            .ok_or_else(|| anyhow!("{} is a local-only event", event.event_type()))?;
        // A send error only means nobody is subscribed yet, which is fine.
        let _ = self.sender(topic).send(event.clone());
        Ok(())
    }

    fn subscribe(&self, topic: BusTopic) -> broadcast::Receiver<TimerEvent> {
        self.sender(topic).subscribe()
    }
}

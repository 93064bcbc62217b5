use sandglass_domain::{CompletionSignal, ScheduleRequest};
use std::sync::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::error;

/// In-process channels between the timer core and the TTL scheduler.
///
/// The core pushes `ScheduleRequest`s, the scheduler pushes
/// `CompletionSignal`s; neither holds a reference to the other. Each receiver
/// can be taken exactly once, by the service that owns that direction.
pub struct CoreChannels {
    schedule_tx: UnboundedSender<ScheduleRequest>,
    schedule_rx: Mutex<Option<UnboundedReceiver<ScheduleRequest>>>,
    completion_tx: UnboundedSender<CompletionSignal>,
    completion_rx: Mutex<Option<UnboundedReceiver<CompletionSignal>>>,
}

impl CoreChannels {
    pub fn new() -> Self {
        let (schedule_tx, schedule_rx) = unbounded_channel();
        let (completion_tx, completion_rx) = unbounded_channel();
        Self {
            schedule_tx,
            schedule_rx: Mutex::new(Some(schedule_rx)),
            completion_tx,
            completion_rx: Mutex::new(Some(completion_rx)),
        }
    }

    pub fn request_schedule(&self, request: ScheduleRequest) {
        if self.schedule_tx.send(request).is_err() {
            error!("Schedule request dropped: scheduler is not running");
        }
    }

    pub fn signal_completion(&self, signal: CompletionSignal) {
        if self.completion_tx.send(signal).is_err() {
            error!("Completion signal dropped: completion listener is not running");
        }
    }

    pub fn take_schedule_requests(&self) -> Option<UnboundedReceiver<ScheduleRequest>> {
        self.schedule_rx.lock().unwrap().take()
    }

    pub fn take_completion_signals(&self) -> Option<UnboundedReceiver<CompletionSignal>> {
        self.completion_rx.lock().unwrap().take()
    }
}

impl Default for CoreChannels {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandglass_domain::ID;

    #[tokio::test]
    async fn receivers_can_be_taken_once() {
        let channels = CoreChannels::new();
        assert!(channels.take_schedule_requests().is_some());
        assert!(channels.take_schedule_requests().is_none());
    }

    #[tokio::test]
    async fn requests_reach_the_taken_receiver() {
        let channels = CoreChannels::new();
        let mut rx = channels.take_schedule_requests().unwrap();

        let timer_id = ID::new();
        channels.request_schedule(ScheduleRequest::Cancel(timer_id.clone()));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.timer_id(), &timer_id);
    }
}

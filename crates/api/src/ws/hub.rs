use sandglass_domain::{TimerEvent, ID};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::warn;

struct SessionEntry {
    sender: mpsc::UnboundedSender<String>,
    timer_id: Option<ID>,
}

/// Registry of this server's live sessions and their timer subscriptions.
///
/// Outbound frames go through per-session channels; the session actor drains
/// its channel into the socket. Sessions whose channel is closed are skipped
/// and cleaned up when their actor stops.
pub struct SessionHub {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a session and returns the receiver half of its outbound
    /// channel.
    pub fn register(&self, session_id: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.write().unwrap().insert(
            session_id.to_string(),
            SessionEntry {
                sender: tx,
                timer_id: None,
            },
        );
        rx
    }

    pub fn unregister(&self, session_id: &str) {
        self.sessions.write().unwrap().remove(session_id);
    }

    pub fn set_subscription(&self, session_id: &str, timer_id: &ID) {
        if let Some(entry) = self.sessions.write().unwrap().get_mut(session_id) {
            entry.timer_id = Some(timer_id.clone());
        }
    }

    pub fn subscription(&self, session_id: &str) -> Option<ID> {
        self.sessions
            .read()
            .unwrap()
            .get(session_id)
            .and_then(|entry| entry.timer_id.clone())
    }

    /// Pushes an event to every local session subscribed to the timer.
    /// Returns how many sessions were reached.
    pub fn publish(&self, timer_id: &ID, event: &TimerEvent) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not serialize {} event: {}", event.event_type(), e);
                return 0;
            }
        };

        let sessions = self.sessions.read().unwrap();
        let mut reached = 0;
        for entry in sessions.values() {
            if entry.timer_id.as_ref() == Some(timer_id)
                && entry.sender.send(payload.clone()).is_ok()
            {
                reached += 1;
            }
        }
        reached
    }

    /// Pushes a frame to one session. Returns false when the session is gone.
    pub fn push_to(&self, session_id: &str, payload: String) -> bool {
        let sessions = self.sessions.read().unwrap();
        match sessions.get(session_id) {
            Some(entry) => entry.sender.send(payload).is_ok(),
            None => false,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

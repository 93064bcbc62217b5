use crate::shared::entity::{Entity, ID};
use chrono::{DateTime, Utc};

/// One server's record of a single completion-notification attempt.
///
/// There is one attempt per server per notification, so a timer can have
/// zero logs (notification lost), one (single server saw it) or many
/// (multi-server race where only one holds the lock).
#[derive(Debug, Clone)]
pub struct CompletionLog {
    pub id: ID,
    pub timer_id: ID,
    pub server_id: String,
    pub notification_received_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub lock_acquired: bool,
    pub success: bool,
    pub error_message: Option<String>,
    pub original_target_time: Option<DateTime<Utc>>,
    /// How late processing started relative to the target instant.
    pub processing_delay_millis: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl CompletionLog {
    pub fn new(
        timer_id: ID,
        server_id: &str,
        notification_received_at: DateTime<Utc>,
        original_target_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Default::default(),
            timer_id,
            server_id: server_id.to_string(),
            notification_received_at,
            processing_started_at: None,
            processing_completed_at: None,
            lock_acquired: false,
            success: false,
            error_message: None,
            original_target_time,
            processing_delay_millis: None,
            created_at: notification_received_at,
        }
    }

    pub fn mark_processing_started(&mut self, started_at: DateTime<Utc>, lock_acquired: bool) {
        self.processing_started_at = Some(started_at);
        self.lock_acquired = lock_acquired;
        if let Some(target) = self.original_target_time {
            self.processing_delay_millis = Some((started_at - target).num_milliseconds());
        }
    }

    pub fn mark_success(&mut self, completed_at: DateTime<Utc>) {
        self.processing_completed_at = Some(completed_at);
        self.success = true;
        self.error_message = None;
    }

    pub fn mark_failure(&mut self, completed_at: DateTime<Utc>, error_message: &str) {
        self.processing_completed_at = Some(completed_at);
        self.success = false;
        self.error_message = Some(error_message.to_string());
    }
}

impl Entity<ID> for CompletionLog {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

/// Why a timer passed its target without a successful completion. Produced by
/// the reconciliation monitor; never surfaced to end users.
#[derive(Debug, Clone, PartialEq)]
pub enum MissedCompletionCause {
    /// No log at all: the key-expiry notification never reached any server.
    NotificationLost,
    /// Logs exist but no server ever held the processing lock.
    LockContentionLost,
    /// The lock holder started processing but failed.
    ProcessingFailed(String),
    /// A log claims success while the timer row is still incomplete: the
    /// winner crashed between emitting the completion and persisting the flag.
    CommitDivergence,
}

impl MissedCompletionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotificationLost => "NOTIFICATION_LOST",
            Self::LockContentionLost => "LOCK_CONTENTION_LOST",
            Self::ProcessingFailed(_) => "PROCESSING_FAILED",
            Self::CommitDivergence => "COMMIT_DIVERGENCE",
        }
    }

    /// Classifies a timer's completion attempts. `logs` must be ordered by
    /// creation time, oldest first.
    pub fn classify(logs: &[CompletionLog]) -> Self {
        let latest = match logs.last() {
            Some(log) => log,
            None => return Self::NotificationLost,
        };
        if logs.iter().all(|l| !l.lock_acquired) {
            return Self::LockContentionLost;
        }
        if latest.success {
            return Self::CommitDivergence;
        }
        Self::ProcessingFailed(
            latest
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        )
    }
}

/// Aggregated completion attempts over a recent window.
#[derive(Debug, Clone)]
pub struct CompletionStats {
    pub total_attempts: i64,
    pub successful_completions: i64,
    pub failed_attempts: i64,
    pub success_rate: f64,
}

impl CompletionStats {
    pub fn new(total_attempts: i64, successful_completions: i64, failed_attempts: i64) -> Self {
        let success_rate = if total_attempts > 0 {
            successful_completions as f64 / total_attempts as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_attempts,
            successful_completions,
            failed_attempts,
            success_rate,
        }
    }
}

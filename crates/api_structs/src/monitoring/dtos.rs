use chrono::{DateTime, Utc};
use sandglass_domain::{CompletionStats, MissedCompletionCause, ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatsDTO {
    pub total_attempts: i64,
    pub successful_completions: i64,
    pub failed_attempts: i64,
    pub success_rate: f64,
}

impl CompletionStatsDTO {
    pub fn new(stats: CompletionStats) -> Self {
        Self {
            total_attempts: stats.total_attempts,
            successful_completions: stats.successful_completions,
            failed_attempts: stats.failed_attempts,
            success_rate: stats.success_rate,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedTimerDTO {
    pub timer_id: ID,
    pub owner_id: String,
    pub target_time: DateTime<Utc>,
    pub delay_minutes: i64,
    pub cause: String,
    pub detail: Option<String>,
}

impl MissedTimerDTO {
    pub fn new(
        timer_id: ID,
        owner_id: String,
        target_time: DateTime<Utc>,
        now: DateTime<Utc>,
        cause: &MissedCompletionCause,
    ) -> Self {
        let detail = match cause {
            MissedCompletionCause::ProcessingFailed(message) => Some(message.clone()),
            _ => None,
        };
        Self {
            timer_id,
            owner_id,
            target_time,
            delay_minutes: (now - target_time).num_minutes(),
            cause: cause.as_str().to_string(),
            detail,
        }
    }
}

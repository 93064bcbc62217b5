use crate::dtos::{CompletionStatsDTO, MissedTimerDTO};
use serde::{Deserialize, Serialize};

pub mod get_completion_stats {
    use super::*;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub stats: CompletionStatsDTO,
    }
}

pub mod detect_missed_timers {
    use super::*;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub checked_timers: usize,
        pub missed_timers: Vec<MissedTimerDTO>,
    }
}

use crate::dtos::{TimerDTO, TimestampMarkDTO};
use chrono::{DateTime, Utc};
use sandglass_domain::{Metadata, Timer, TimestampMark, ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerResponse {
    pub timer: TimerDTO,
}

impl TimerResponse {
    pub fn new(
        timer: &Timer,
        user_id: Option<&str>,
        now: DateTime<Utc>,
        online_user_count: i64,
    ) -> Self {
        Self {
            timer: TimerDTO::new(timer, user_id, now, online_user_count),
        }
    }
}

pub mod create_timer {
    use super::*;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub target_seconds: i64,
        pub owner_id: String,
    }

    pub type APIResponse = TimerResponse;
}

pub mod get_timer {
    use super::*;

    #[derive(Serialize, Deserialize)]
    pub struct PathParams {
        pub timer_id: ID,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct QueryParams {
        pub user_id: Option<String>,
    }

    pub type APIResponse = TimerResponse;
}

pub mod get_timer_by_share_token {
    use super::*;

    #[derive(Serialize, Deserialize)]
    pub struct PathParams {
        pub share_token: String,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct QueryParams {
        pub user_id: Option<String>,
    }

    pub type APIResponse = TimerResponse;
}

pub mod change_target_time {
    use super::*;

    #[derive(Serialize, Deserialize)]
    pub struct PathParams {
        pub timer_id: ID,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub new_target_time: DateTime<Utc>,
        pub changed_by: String,
    }

    pub type APIResponse = TimerResponse;
}

pub mod save_timestamp {
    use super::*;

    #[derive(Serialize, Deserialize)]
    pub struct PathParams {
        pub timer_id: ID,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub user_id: String,
        pub target_time: DateTime<Utc>,
        #[serde(default)]
        pub metadata: Metadata,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub mark: TimestampMarkDTO,
    }

    impl APIResponse {
        pub fn new(mark: TimestampMark) -> Self {
            Self {
                mark: TimestampMarkDTO::new(mark),
            }
        }
    }
}

pub mod get_timer_history {
    use super::*;

    #[derive(Serialize, Deserialize)]
    pub struct PathParams {
        pub timer_id: ID,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub marks: Vec<TimestampMarkDTO>,
    }

    impl APIResponse {
        pub fn new(marks: Vec<TimestampMark>) -> Self {
            Self {
                marks: marks.into_iter().map(TimestampMarkDTO::new).collect(),
            }
        }
    }
}

pub mod get_user_timer_history {
    use super::*;

    #[derive(Serialize, Deserialize)]
    pub struct PathParams {
        pub timer_id: ID,
        pub user_id: String,
    }

    pub use super::get_timer_history::APIResponse;
}

pub mod complete_timer {
    use super::*;

    #[derive(Serialize, Deserialize)]
    pub struct PathParams {
        pub timer_id: ID,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub requested_by: String,
    }

    pub type APIResponse = TimerResponse;
}

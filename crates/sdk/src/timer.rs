use crate::{APIResponse, BaseClient};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use sandglass_api_structs::*;
use sandglass_domain::{Metadata, ID};
use std::sync::Arc;

#[derive(Clone)]
pub struct TimerClient {
    base: Arc<BaseClient>,
}

pub struct CreateTimerInput {
    pub target_seconds: i64,
    pub owner_id: String,
}

pub struct ChangeTargetTimeInput {
    pub timer_id: ID,
    pub new_target_time: DateTime<Utc>,
    pub changed_by: String,
}

pub struct SaveTimestampInput {
    pub timer_id: ID,
    pub user_id: String,
    pub target_time: DateTime<Utc>,
    pub metadata: Metadata,
}

impl TimerClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn create(&self, input: CreateTimerInput) -> APIResponse<create_timer::APIResponse> {
        let body = create_timer::RequestBody {
            target_seconds: input.target_seconds,
            owner_id: input.owner_id,
        };
        self.base
            .post(body, "timers".into(), StatusCode::OK)
            .await
    }

    pub async fn get(
        &self,
        timer_id: ID,
        user_id: Option<String>,
    ) -> APIResponse<get_timer::APIResponse> {
        let path = match user_id {
            Some(user_id) => format!("timers/{}?userId={}", timer_id, user_id),
            None => format!("timers/{}", timer_id),
        };
        self.base.get(path, StatusCode::OK).await
    }

    pub async fn get_by_share_token(
        &self,
        share_token: String,
        user_id: Option<String>,
    ) -> APIResponse<get_timer_by_share_token::APIResponse> {
        let path = match user_id {
            Some(user_id) => format!("timers/shared/{}?userId={}", share_token, user_id),
            None => format!("timers/shared/{}", share_token),
        };
        self.base.get(path, StatusCode::OK).await
    }

    pub async fn change_target_time(
        &self,
        input: ChangeTargetTimeInput,
    ) -> APIResponse<change_target_time::APIResponse> {
        let body = change_target_time::RequestBody {
            new_target_time: input.new_target_time,
            changed_by: input.changed_by,
        };
        self.base
            .put(
                body,
                format!("timers/{}/target-time", input.timer_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn save_timestamp(
        &self,
        input: SaveTimestampInput,
    ) -> APIResponse<save_timestamp::APIResponse> {
        let body = save_timestamp::RequestBody {
            user_id: input.user_id,
            target_time: input.target_time,
            metadata: input.metadata,
        };
        self.base
            .post(
                body,
                format!("timers/{}/timestamps", input.timer_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn history(&self, timer_id: ID) -> APIResponse<get_timer_history::APIResponse> {
        self.base
            .get(format!("timers/{}/history", timer_id), StatusCode::OK)
            .await
    }

    pub async fn user_history(
        &self,
        timer_id: ID,
        user_id: String,
    ) -> APIResponse<get_user_timer_history::APIResponse> {
        self.base
            .get(
                format!("timers/{}/users/{}/history", timer_id, user_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn complete(
        &self,
        timer_id: ID,
        requested_by: String,
    ) -> APIResponse<complete_timer::APIResponse> {
        let body = complete_timer::RequestBody { requested_by };
        self.base
            .post(
                body,
                format!("timers/{}/complete", timer_id),
                StatusCode::OK,
            )
            .await
    }
}

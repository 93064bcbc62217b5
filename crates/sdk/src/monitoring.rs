use crate::{APIResponse, BaseClient};
use reqwest::StatusCode;
use sandglass_api_structs::*;
use std::sync::Arc;

#[derive(Clone)]
pub struct MonitoringClient {
    base: Arc<BaseClient>,
}

impl MonitoringClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn completion_stats(&self) -> APIResponse<get_completion_stats::APIResponse> {
        self.base
            .get("monitoring/completion-stats".into(), StatusCode::OK)
            .await
    }

    pub async fn detect_missed_timers(&self) -> APIResponse<detect_missed_timers::APIResponse> {
        self.base
            .post(
                serde_json::json!({}),
                "monitoring/detect-missed-timers".into(),
                StatusCode::OK,
            )
            .await
    }
}

use crate::error::SandglassError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use sandglass_api_structs::save_timestamp::*;
use sandglass_domain::{Metadata, TimerEvent, TimestampMark, ID};
use sandglass_infra::SandglassContext;
use tracing::warn;

pub async fn save_timestamp_controller(
    path_params: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<SandglassContext>,
) -> Result<HttpResponse, SandglassError> {
    let body = body.0;
    let usecase = SaveTimestampUseCase {
        timer_id: path_params.timer_id.clone(),
        user_id: body.user_id,
        target_time: body.target_time,
        metadata: body.metadata,
    };

    execute(usecase, &ctx)
        .await
        .map(|mark| HttpResponse::Ok().json(APIResponse::new(mark)))
        .map_err(SandglassError::from)
}

#[derive(Debug)]
pub struct SaveTimestampUseCase {
    pub timer_id: ID,
    pub user_id: String,
    pub target_time: DateTime<Utc>,
    pub metadata: Metadata,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

impl From<UseCaseError> for SandglassError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(timer_id) => {
                Self::NotFound(format!("The timer with id: {}, was not found.", timer_id))
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for SaveTimestampUseCase {
    type Response = TimestampMark;

    type Error = UseCaseError;

    const NAME: &'static str = "SaveTimestamp";

    async fn execute(&mut self, ctx: &SandglassContext) -> Result<Self::Response, Self::Error> {
        let timer = ctx
            .repos
            .timers
            .find(&self.timer_id)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.timer_id.clone()))?;

        let now = ctx.sys.now();
        let mark = TimestampMark::new(
            timer.id.clone(),
            &self.user_id,
            self.target_time,
            self.metadata.clone(),
            now,
        );

        ctx.repos
            .timestamps
            .insert(&mark)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let event = TimerEvent::TimestampSaved {
            event_id: ID::new(),
            timer_id: timer.id.clone(),
            timestamp: now,
            origin_server_id: ctx.config.server_instance_id.clone(),
            user_id: self.user_id.clone(),
            saved_at: mark.saved_at,
            remaining_millis: mark.remaining_millis,
            target_time: mark.target_at_save,
            metadata: mark.metadata.clone(),
        };
        if let Err(e) = ctx.bus.publish(&event).await {
            // The mark is already durable; peers will miss the live update
            // but see it in the history.
            warn!("Publishing TIMESTAMP_SAVED for timer {} failed: {}", timer.id, e);
        }

        Ok(mark)
    }
}

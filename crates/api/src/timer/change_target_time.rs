use crate::error::SandglassError;
use crate::shared::usecase::{execute, Subscriber, UseCase};
use crate::timer::subscribers::SyncScheduleOnTargetChanged;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use sandglass_api_structs::change_target_time::*;
use sandglass_domain::{Timer, TimerEvent, ID};
use sandglass_infra::SandglassContext;

pub async fn change_target_time_controller(
    path_params: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<SandglassContext>,
) -> Result<HttpResponse, SandglassError> {
    let body = body.0;
    let usecase = ChangeTargetTimeUseCase {
        timer_id: path_params.timer_id.clone(),
        new_target_time: body.new_target_time,
        changed_by: body.changed_by,
    };
    let user_id = usecase.changed_by.clone();

    execute(usecase, &ctx)
        .await
        .map(|res| {
            HttpResponse::Ok().json(APIResponse::new(
                &res.timer,
                Some(&user_id),
                ctx.sys.now(),
                res.online_user_count,
            ))
        })
        .map_err(SandglassError::from)
}

#[derive(Debug)]
pub struct ChangeTargetTimeUseCase {
    pub timer_id: ID,
    pub new_target_time: DateTime<Utc>,
    pub changed_by: String,
}

#[derive(Debug)]
pub struct UseCaseRes {
    pub timer: Timer,
    pub online_user_count: i64,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    NotTheOwner,
    AlreadyCompleted,
    TargetInThePast,
    StorageError,
}

impl From<UseCaseError> for SandglassError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(timer_id) => {
                Self::NotFound(format!("The timer with id: {}, was not found.", timer_id))
            }
            UseCaseError::NotTheOwner => {
                Self::Forbidden("Only the timer owner can change the target time.".into())
            }
            UseCaseError::AlreadyCompleted => {
                Self::Conflict("The timer is already completed; its target time is frozen.".into())
            }
            UseCaseError::TargetInThePast => {
                Self::BadClientData("The new target time must lie in the future.".into())
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for ChangeTargetTimeUseCase {
    type Response = UseCaseRes;

    type Error = UseCaseError;

    const NAME: &'static str = "ChangeTargetTime";

    async fn execute(&mut self, ctx: &SandglassContext) -> Result<Self::Response, Self::Error> {
        let mut timer = ctx
            .repos
            .timers
            .find(&self.timer_id)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.timer_id.clone()))?;

        if timer.owner_id != self.changed_by {
            return Err(UseCaseError::NotTheOwner);
        }
        if timer.completed {
            return Err(UseCaseError::AlreadyCompleted);
        }
        let now = ctx.sys.now();
        if self.new_target_time <= now {
            return Err(UseCaseError::TargetInThePast);
        }

        let old_target_time = timer.target_time;
        timer.target_time = self.new_target_time;
        timer.updated_at = now;

        ctx.repos
            .timers
            .save(&timer)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let event = TimerEvent::TargetTimeChanged {
            event_id: ID::new(),
            timer_id: timer.id.clone(),
            timestamp: now,
            origin_server_id: ctx.config.server_instance_id.clone(),
            old_target_time: Some(old_target_time),
            new_target_time: self.new_target_time,
            changed_by: self.changed_by.clone(),
        };
        ctx.bus
            .publish(&event)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let online_user_count = ctx
            .presence
            .online_count(&timer.id)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(UseCaseRes {
            timer,
            online_user_count,
        })
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(SyncScheduleOnTargetChanged)]
    }
}

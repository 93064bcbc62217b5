use crate::error::SandglassError;
use crate::shared::usecase::{execute, Subscriber, UseCase};
use crate::timer::subscribers::CancelScheduleOnTimerCompleted;
use actix_web::{web, HttpResponse};
use sandglass_domain::{Timer, TimerEvent, ID};
use sandglass_infra::SandglassContext;
use tracing::info;

pub async fn complete_timer_controller(
    path_params: web::Path<sandglass_api_structs::complete_timer::PathParams>,
    body: web::Json<sandglass_api_structs::complete_timer::RequestBody>,
    ctx: web::Data<SandglassContext>,
) -> Result<HttpResponse, SandglassError> {
    let body = body.0;
    let usecase = CompleteTimerUseCase {
        timer_id: path_params.timer_id.clone(),
        trigger: CompletionTrigger::User(body.requested_by),
    };
    let user_id = match &usecase.trigger {
        CompletionTrigger::User(user_id) => Some(user_id.clone()),
        CompletionTrigger::Scheduler => None,
    };

    execute(usecase, &ctx)
        .await
        .map(|res| {
            HttpResponse::Ok().json(sandglass_api_structs::complete_timer::APIResponse::new(
                &res.timer,
                user_id.as_deref(),
                ctx.sys.now(),
                res.online_user_count,
            ))
        })
        .map_err(SandglassError::from)
}

/// Who asked for the completion. The scheduler path has already won the
/// fleet-wide completion mutex; the user path is the owner forcing an early
/// finish.
#[derive(Debug)]
pub enum CompletionTrigger {
    Scheduler,
    User(String),
}

#[derive(Debug)]
pub struct CompleteTimerUseCase {
    pub timer_id: ID,
    pub trigger: CompletionTrigger,
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
    StorageError,
}

impl From<UseCaseError> for SandglassError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(timer_id) => {
                Self::NotFound(format!("The timer with id: {}, was not found.", timer_id))
            }
            UseCaseError::NotTheOwner => {
                Self::Forbidden("Only the timer owner can force completion.".into())
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CompleteTimerUseCase {
    type Response = UseCaseRes;

    type Error = UseCaseError;

    const NAME: &'static str = "CompleteTimer";

    async fn execute(&mut self, ctx: &SandglassContext) -> Result<Self::Response, Self::Error> {
        let mut timer = ctx
            .repos
            .timers
            .find(&self.timer_id)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.timer_id.clone()))?;

        if let CompletionTrigger::User(user_id) = &self.trigger {
            if timer.owner_id != *user_id {
                return Err(UseCaseError::NotTheOwner);
            }
        }

        let online_user_count = ctx
            .presence
            .online_count(&timer.id)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        // Completion is idempotent: a second notification or a force request
        // on a finished timer changes nothing and emits nothing.
        if timer.completed {
            info!("Timer {} is already completed. Nothing to do.", timer.id);
            return Ok(UseCaseRes {
                timer,
                online_user_count,
            });
        }

        let now = ctx.sys.now();
        timer.completed = true;
        timer.completed_at = Some(now);
        timer.updated_at = now;

        ctx.repos
            .timers
            .save(&timer)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let event = TimerEvent::TimerCompleted {
            event_id: ID::new(),
            timer_id: timer.id.clone(),
            timestamp: now,
            origin_server_id: ctx.config.server_instance_id.clone(),
            completed_target_time: timer.target_time,
            completed_at: now,
            owner_id: timer.owner_id.clone(),
            online_user_count,
        };
        ctx.bus
            .publish(&event)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        info!("Timer {} completed.", timer.id);
        Ok(UseCaseRes {
            timer,
            online_user_count,
        })
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(CancelScheduleOnTimerCompleted)]
    }
}

use crate::error::SandglassError;
use crate::shared::usecase::{execute, Subscriber, UseCase};
use crate::timer::subscribers::ScheduleOnTimerCreated;
use actix_web::{web, HttpResponse};
use chrono::Duration;
use sandglass_api_structs::create_timer::*;
use sandglass_domain::Timer;
use sandglass_infra::SandglassContext;

pub async fn create_timer_controller(
    body: web::Json<RequestBody>,
    ctx: web::Data<SandglassContext>,
) -> Result<HttpResponse, SandglassError> {
    let body = body.0;
    let usecase = CreateTimerUseCase {
        target_seconds: body.target_seconds,
        owner_id: body.owner_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|timer| {
            let now = ctx.sys.now();
            HttpResponse::Ok().json(APIResponse::new(&timer, Some(&timer.owner_id), now, 0))
        })
        .map_err(SandglassError::from)
}

#[derive(Debug)]
pub struct CreateTimerUseCase {
    pub target_seconds: i64,
    pub owner_id: String,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    InvalidTarget(i64),
    StorageError,
}

impl From<UseCaseError> for SandglassError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidTarget(secs) => Self::BadClientData(format!(
                "Invalid timer duration: {} seconds. It must be greater than zero.",
                secs
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateTimerUseCase {
    type Response = Timer;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateTimer";

    async fn execute(&mut self, ctx: &SandglassContext) -> Result<Self::Response, Self::Error> {
        if self.target_seconds <= 0 {
            return Err(UseCaseError::InvalidTarget(self.target_seconds));
        }

        let now = ctx.sys.now();
        let timer = Timer::new(
            &self.owner_id,
            now + Duration::seconds(self.target_seconds),
            now,
        );

        ctx.repos
            .timers
            .insert(&timer)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(timer)
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(ScheduleOnTimerCreated)]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[actix_web::test]
    async fn creates_timer_with_future_target() {
        let ctx = SandglassContext::create_inmemory();

        let mut usecase = CreateTimerUseCase {
            target_seconds: 180,
            owner_id: "u1".into(),
        };

        let timer = usecase.execute(&ctx).await.expect("to create timer");
        assert_eq!(timer.owner_id, "u1");
        assert!(!timer.completed);
        assert!(timer.target_time > timer.created_at);
        assert!(ctx.repos.timers.find(&timer.id).await.is_some());
    }

    #[actix_web::test]
    async fn rejects_non_positive_duration() {
        let ctx = SandglassContext::create_inmemory();

        for target_seconds in [0, -5].iter() {
            let mut usecase = CreateTimerUseCase {
                target_seconds: *target_seconds,
                owner_id: "u1".into(),
            };
            let res = usecase.execute(&ctx).await;
            assert_eq!(res.unwrap_err(), UseCaseError::InvalidTarget(*target_seconds));
        }
    }
}

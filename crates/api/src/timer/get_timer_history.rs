use crate::error::SandglassError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use sandglass_api_structs::get_timer_history::*;
use sandglass_domain::{TimestampMark, ID};
use sandglass_infra::SandglassContext;

pub async fn get_timer_history_controller(
    path_params: web::Path<PathParams>,
    ctx: web::Data<SandglassContext>,
) -> Result<HttpResponse, SandglassError> {
    let usecase = GetTimerHistoryUseCase {
        timer_id: path_params.timer_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|marks| HttpResponse::Ok().json(APIResponse::new(marks)))
        .map_err(SandglassError::from)
}

#[derive(Debug)]
pub struct GetTimerHistoryUseCase {
    pub timer_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
}

impl From<UseCaseError> for SandglassError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(timer_id) => {
                Self::NotFound(format!("The timer with id: {}, was not found.", timer_id))
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetTimerHistoryUseCase {
    type Response = Vec<TimestampMark>;

    type Error = UseCaseError;

    const NAME: &'static str = "GetTimerHistory";

    async fn execute(&mut self, ctx: &SandglassContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .timers
            .find(&self.timer_id)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.timer_id.clone()))?;

        Ok(ctx.repos.timestamps.find_by_timer(&self.timer_id).await)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration, Utc};
    use sandglass_domain::Timer;

    #[actix_web::test]
    async fn lists_all_marks_for_a_timer() {
        let ctx = SandglassContext::create_inmemory();
        let now = Utc::now();
        let timer = Timer::new("u1", now + Duration::minutes(10), now);
        ctx.repos.timers.insert(&timer).await.unwrap();

        for user in ["u1", "u2"].iter() {
            let mark = TimestampMark::new(
                timer.id.clone(),
                user,
                timer.target_time,
                Default::default(),
                now,
            );
            ctx.repos.timestamps.insert(&mark).await.unwrap();
        }

        let mut usecase = GetTimerHistoryUseCase {
            timer_id: timer.id.clone(),
        };
        let marks = usecase.execute(&ctx).await.unwrap();
        assert_eq!(marks.len(), 2);
    }

    #[actix_web::test]
    async fn missing_timer_is_not_found() {
        let ctx = SandglassContext::create_inmemory();
        let timer_id = ID::new();

        let mut usecase = GetTimerHistoryUseCase {
            timer_id: timer_id.clone(),
        };
        assert_eq!(
            usecase.execute(&ctx).await.unwrap_err(),
            UseCaseError::NotFound(timer_id)
        );
    }
}

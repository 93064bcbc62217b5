use crate::error::SandglassError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use sandglass_api_structs::{get_timer, get_timer_by_share_token};
use sandglass_domain::{Timer, ID};
use sandglass_infra::SandglassContext;

pub async fn get_timer_controller(
    path_params: web::Path<get_timer::PathParams>,
    query_params: web::Query<get_timer::QueryParams>,
    ctx: web::Data<SandglassContext>,
) -> Result<HttpResponse, SandglassError> {
    let usecase = GetTimerUseCase {
        lookup: TimerLookup::ById(path_params.timer_id.clone()),
        user_id: query_params.0.user_id,
    };
    let user_id = usecase.user_id.clone();

    execute(usecase, &ctx)
        .await
        .map(|res| {
            HttpResponse::Ok().json(get_timer::APIResponse::new(
                &res.timer,
                user_id.as_deref(),
                ctx.sys.now(),
                res.online_user_count,
            ))
        })
        .map_err(SandglassError::from)
}

pub async fn get_timer_by_share_token_controller(
    path_params: web::Path<get_timer_by_share_token::PathParams>,
    query_params: web::Query<get_timer_by_share_token::QueryParams>,
    ctx: web::Data<SandglassContext>,
) -> Result<HttpResponse, SandglassError> {
    let usecase = GetTimerUseCase {
        lookup: TimerLookup::ByShareToken(path_params.share_token.clone()),
        user_id: query_params.0.user_id,
    };
    let user_id = usecase.user_id.clone();

    execute(usecase, &ctx)
        .await
        .map(|res| {
            HttpResponse::Ok().json(get_timer_by_share_token::APIResponse::new(
                &res.timer,
                user_id.as_deref(),
                ctx.sys.now(),
                res.online_user_count,
            ))
        })
        .map_err(SandglassError::from)
}

#[derive(Debug, Clone)]
pub enum TimerLookup {
    ById(ID),
    ByShareToken(String),
}

#[derive(Debug)]
pub struct GetTimerUseCase {
    pub lookup: TimerLookup,
    pub user_id: Option<String>,
}

#[derive(Debug)]
pub struct UseCaseRes {
    pub timer: Timer,
    pub online_user_count: i64,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound,
    StorageError,
}

impl From<UseCaseError> for SandglassError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound => Self::NotFound("The requested timer was not found.".into()),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetTimerUseCase {
    type Response = UseCaseRes;

    type Error = UseCaseError;

    const NAME: &'static str = "GetTimer";

    async fn execute(&mut self, ctx: &SandglassContext) -> Result<Self::Response, Self::Error> {
        let timer = match &self.lookup {
            TimerLookup::ById(timer_id) => ctx.repos.timers.find(timer_id).await,
            TimerLookup::ByShareToken(share_token) => {
                ctx.repos.timers.find_by_share_token(share_token).await
            }
        }
        .ok_or(UseCaseError::NotFound)?;

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
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration, Utc};

    #[actix_web::test]
    async fn finds_timer_by_id_and_token() {
        let ctx = SandglassContext::create_inmemory();
        let now = Utc::now();
        let timer = Timer::new("u1", now + Duration::minutes(5), now);
        ctx.repos.timers.insert(&timer).await.unwrap();

        let mut by_id = GetTimerUseCase {
            lookup: TimerLookup::ById(timer.id.clone()),
            user_id: Some("u1".into()),
        };
        let res = by_id.execute(&ctx).await.unwrap();
        assert_eq!(res.timer.id, timer.id);
        assert_eq!(res.online_user_count, 0);

        let mut by_token = GetTimerUseCase {
            lookup: TimerLookup::ByShareToken(timer.share_token.clone()),
            user_id: None,
        };
        let res = by_token.execute(&ctx).await.unwrap();
        assert_eq!(res.timer.id, timer.id);
    }

    #[actix_web::test]
    async fn missing_timer_is_not_found() {
        let ctx = SandglassContext::create_inmemory();

        let mut usecase = GetTimerUseCase {
            lookup: TimerLookup::ById(ID::new()),
            user_id: None,
        };
        assert_eq!(
            usecase.execute(&ctx).await.unwrap_err(),
            UseCaseError::NotFound
        );

        let mut usecase = GetTimerUseCase {
            lookup: TimerLookup::ByShareToken("bogus".into()),
            user_id: None,
        };
        assert_eq!(
            usecase.execute(&ctx).await.unwrap_err(),
            UseCaseError::NotFound
        );
    }

    #[actix_web::test]
    async fn reports_the_fleet_wide_online_count() {
        let ctx = SandglassContext::create_inmemory();
        let now = Utc::now();
        let timer = Timer::new("u1", now + Duration::minutes(5), now);
        ctx.repos.timers.insert(&timer).await.unwrap();

        ctx.presence
            .record_connection(&timer.id, "u1", "s1", "sess-1", now)
            .await
            .unwrap();
        ctx.presence
            .record_connection(&timer.id, "u2", "s2", "sess-2", now)
            .await
            .unwrap();

        let mut usecase = GetTimerUseCase {
            lookup: TimerLookup::ById(timer.id.clone()),
            user_id: Some("u2".into()),
        };
        let res = usecase.execute(&ctx).await.unwrap();
        assert_eq!(res.online_user_count, 2);
    }
}

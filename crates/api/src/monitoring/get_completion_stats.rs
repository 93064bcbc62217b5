use crate::error::SandglassError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use chrono::Duration;
use sandglass_api_structs::dtos::CompletionStatsDTO;
use sandglass_api_structs::get_completion_stats::*;
use sandglass_domain::CompletionStats;
use sandglass_infra::SandglassContext;

pub async fn get_completion_stats_controller(
    ctx: web::Data<SandglassContext>,
) -> Result<HttpResponse, SandglassError> {
    let usecase = GetCompletionStatsUseCase {
        window: Duration::hours(1),
    };

    execute(usecase, &ctx)
        .await
        .map(|stats| {
            HttpResponse::Ok().json(APIResponse {
                stats: CompletionStatsDTO::new(stats),
            })
        })
        .map_err(SandglassError::from)
}

#[derive(Debug)]
pub struct GetCompletionStatsUseCase {
    pub window: Duration,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

impl From<UseCaseError> for SandglassError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetCompletionStatsUseCase {
    type Response = CompletionStats;

    type Error = UseCaseError;

    const NAME: &'static str = "GetCompletionStats";

    async fn execute(&mut self, ctx: &SandglassContext) -> Result<Self::Response, Self::Error> {
        let since = ctx.sys.now() - self.window;
        ctx.repos
            .completion_logs
            .stats_since(since)
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use sandglass_domain::{CompletionLog, ID};

    #[actix_web::test]
    async fn aggregates_the_last_hour() {
        let ctx = SandglassContext::create_inmemory();
        let now = Utc::now();

        let mut winner = CompletionLog::new(ID::new(), "s1", now, Some(now));
        winner.mark_processing_started(now, true);
        winner.mark_success(now);
        ctx.repos.completion_logs.insert(&winner).await.unwrap();

        let mut loser = CompletionLog::new(ID::new(), "s2", now, Some(now));
        loser.mark_processing_started(now, false);
        loser.mark_failure(now, "lock not acquired");
        ctx.repos.completion_logs.insert(&loser).await.unwrap();

        let mut usecase = GetCompletionStatsUseCase {
            window: Duration::hours(1),
        };
        let stats = usecase.execute(&ctx).await.unwrap();
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.successful_completions, 1);
        assert_eq!(stats.failed_attempts, 1);
        assert_eq!(stats.success_rate, 50.0);
    }
}

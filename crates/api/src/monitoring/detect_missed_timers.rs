use crate::error::SandglassError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use chrono::Duration;
use sandglass_api_structs::detect_missed_timers::*;
use sandglass_api_structs::dtos::MissedTimerDTO;
use sandglass_domain::{MissedCompletionCause, Timer};
use sandglass_infra::SandglassContext;
use tracing::{debug, error};

pub async fn detect_missed_timers_controller(
    ctx: web::Data<SandglassContext>,
) -> Result<HttpResponse, SandglassError> {
    let usecase = DetectMissedTimersUseCase {};
    let now = ctx.sys.now();

    execute(usecase, &ctx)
        .await
        .map(|report| {
            HttpResponse::Ok().json(APIResponse {
                checked_timers: report.checked_timers,
                missed_timers: report
                    .missed
                    .iter()
                    .map(|missed| {
                        MissedTimerDTO::new(
                            missed.timer.id.clone(),
                            missed.timer.owner_id.clone(),
                            missed.timer.target_time,
                            now,
                            &missed.cause,
                        )
                    })
                    .collect(),
            })
        })
        .map_err(SandglassError::from)
}

#[derive(Debug)]
pub struct MissedTimer {
    pub timer: Timer,
    pub cause: MissedCompletionCause,
}

#[derive(Debug)]
pub struct MissedTimersReport {
    pub checked_timers: usize,
    pub missed: Vec<MissedTimer>,
}

/// The reconciliation pass: joins recently overdue timers against the
/// completion log and classifies every miss. Pure observability; nothing is
/// retried here.
#[derive(Debug)]
pub struct DetectMissedTimersUseCase {}

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
impl UseCase for DetectMissedTimersUseCase {
    type Response = MissedTimersReport;

    type Error = UseCaseError;

    const NAME: &'static str = "DetectMissedTimers";

    async fn execute(&mut self, ctx: &SandglassContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.now();
        let window_start = now - Duration::minutes(ctx.config.missed_timer_window_minutes);

        let overdue = ctx.repos.timers.find_overdue(now, window_start).await;
        if overdue.is_empty() {
            debug!("No overdue timers in the reconciliation window.");
            return Ok(MissedTimersReport {
                checked_timers: 0,
                missed: vec![],
            });
        }
        debug!("Checking {} overdue timer(s).", overdue.len());

        let checked_timers = overdue.len();
        let mut missed = Vec::new();
        for timer in overdue {
            let has_success = ctx
                .repos
                .completion_logs
                .exists_successful(&timer.id)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            if has_success {
                continue;
            }

            let logs = ctx.repos.completion_logs.find_by_timer(&timer.id).await;
            let cause = MissedCompletionCause::classify(&logs);
            error!(
                timer_id = %timer.id,
                owner_id = %timer.owner_id,
                target_time = %timer.target_time,
                delay_minutes = (now - timer.target_time).num_minutes(),
                cause = cause.as_str(),
                "Missed timer completion detected"
            );
            missed.push(MissedTimer { timer, cause });
        }

        Ok(MissedTimersReport {
            checked_timers,
            missed,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use sandglass_domain::{CompletionLog, ID};

    async fn overdue_timer(ctx: &SandglassContext) -> Timer {
        let now = Utc::now();
        let timer = Timer::new("u1", now - Duration::minutes(2), now - Duration::minutes(10));
        ctx.repos.timers.insert(&timer).await.unwrap();
        timer
    }

    async fn detect(ctx: &SandglassContext) -> MissedTimersReport {
        DetectMissedTimersUseCase {}.execute(ctx).await.unwrap()
    }

    #[actix_web::test]
    async fn successfully_completed_timers_are_not_reported() {
        let ctx = SandglassContext::create_inmemory();
        let timer = overdue_timer(&ctx).await;

        let now = Utc::now();
        let mut log = CompletionLog::new(timer.id.clone(), "s1", now, Some(timer.target_time));
        log.mark_processing_started(now, true);
        log.mark_success(now);
        ctx.repos.completion_logs.insert(&log).await.unwrap();

        let report = detect(&ctx).await;
        assert_eq!(report.checked_timers, 1);
        assert!(report.missed.is_empty());
    }

    #[actix_web::test]
    async fn no_log_at_all_is_a_lost_notification() {
        let ctx = SandglassContext::create_inmemory();
        overdue_timer(&ctx).await;

        let report = detect(&ctx).await;
        assert_eq!(report.missed.len(), 1);
        assert_eq!(
            report.missed[0].cause,
            MissedCompletionCause::NotificationLost
        );
    }

    #[actix_web::test]
    async fn all_lock_losers_is_contention_lost() {
        let ctx = SandglassContext::create_inmemory();
        let timer = overdue_timer(&ctx).await;

        let now = Utc::now();
        for server in ["s1", "s2"].iter() {
            let mut log = CompletionLog::new(timer.id.clone(), server, now, Some(timer.target_time));
            log.mark_processing_started(now, false);
            log.mark_failure(now, "lock not acquired");
            ctx.repos.completion_logs.insert(&log).await.unwrap();
        }

        let report = detect(&ctx).await;
        assert_eq!(
            report.missed[0].cause,
            MissedCompletionCause::LockContentionLost
        );
    }

    #[actix_web::test]
    async fn failed_lock_holder_reports_its_error() {
        let ctx = SandglassContext::create_inmemory();
        let timer = overdue_timer(&ctx).await;

        let now = Utc::now();
        let mut log = CompletionLog::new(timer.id.clone(), "s1", now, Some(timer.target_time));
        log.mark_processing_started(now, true);
        log.mark_failure(now, "primary store write failed");
        ctx.repos.completion_logs.insert(&log).await.unwrap();

        let report = detect(&ctx).await;
        assert_eq!(
            report.missed[0].cause,
            MissedCompletionCause::ProcessingFailed("primary store write failed".into())
        );
    }

    #[actix_web::test]
    async fn old_misses_are_outside_the_window() {
        let ctx = SandglassContext::create_inmemory();
        let now = Utc::now();
        let stale = Timer::new("u1", now - Duration::minutes(30), now - Duration::hours(1));
        ctx.repos.timers.insert(&stale).await.unwrap();

        let report = detect(&ctx).await;
        assert_eq!(report.checked_timers, 0);
        assert!(report.missed.is_empty());
    }
}

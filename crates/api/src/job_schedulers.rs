use crate::monitoring::DetectMissedTimersUseCase;
use crate::shared::usecase::execute;
use sandglass_infra::SandglassContext;
use std::time::Duration;
use tracing::error;

const DETECTION_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the reconciliation monitor once a minute on every server. The
/// monitor only reports; remediation is manual or policy-driven.
pub fn start_missed_timer_detection_job(ctx: SandglassContext) {
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(DETECTION_INTERVAL);
        // The first tick fires immediately; skip it so a fresh server does
        // not re-alert on timers an earlier run already reported.
        interval.tick().await;
        loop {
            interval.tick().await;
            let usecase = DetectMissedTimersUseCase {};
            if let Err(e) = execute(usecase, &ctx).await {
                error!("Missed timer detection run failed: {:?}", e);
            }
        }
    });
}

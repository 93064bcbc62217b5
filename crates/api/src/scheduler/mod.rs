use sandglass_domain::{CompletionLog, CompletionSignal, ScheduleRequest, Timer, ID};
use sandglass_infra::SandglassContext;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

const TIMER_SCHEDULE_PREFIX: &str = "timer:schedule:";
const PROCESSING_LOCK_PREFIX: &str = "timer:processing:";

/// Bounds the blast radius when a completion winner crashes mid-flight; the
/// reconciliation monitor picks the timer up afterwards. Never relied on for
/// release, which happens explicitly after processing.
const PROCESSING_LOCK_TTL: Duration = Duration::from_secs(5 * 60);

fn schedule_key(timer_id: &ID) -> String {
    format!("{}{}", TIMER_SCHEDULE_PREFIX, timer_id)
}

fn processing_key(timer_id: &ID) -> String {
    format!("{}{}", PROCESSING_LOCK_PREFIX, timer_id)
}

/// Starts the TTL scheduler: one task maintaining `timer:schedule:*` keys
/// from core requests, one task racing the fleet on key-expiry
/// notifications.
pub fn start_ttl_scheduler(ctx: SandglassContext) {
    let requests = ctx
        .channels
        .take_schedule_requests()
        .expect("Schedule request receiver to be taken only by the TTL scheduler");

    let request_ctx = ctx.clone();
    actix_web::rt::spawn(async move {
        let mut requests = requests;
        info!("TTL scheduler started.");
        while let Some(request) = requests.recv().await {
            let timer_id = request.timer_id().clone();
            let res = match request {
                ScheduleRequest::Schedule(timer) => schedule_timer(&request_ctx, &timer).await,
                ScheduleRequest::Update(timer) => update_timer_schedule(&request_ctx, &timer).await,
                ScheduleRequest::Cancel(timer_id) => {
                    cancel_timer_schedule(&request_ctx, &timer_id).await
                }
            };
            if let Err(e) = res {
                error!("Schedule request for timer {} failed: {}", timer_id, e);
            }
        }
    });

    let mut expirations = ctx.store.expirations();
    actix_web::rt::spawn(async move {
        loop {
            match expirations.recv().await {
                Ok(expired_key) => {
                    let timer_id = match expired_key.strip_prefix(TIMER_SCHEDULE_PREFIX) {
                        Some(raw) => match raw.parse::<ID>() {
                            Ok(timer_id) => timer_id,
                            Err(_) => {
                                warn!("Malformed schedule key expired: {}", expired_key);
                                continue;
                            }
                        },
                        // Expiry of some other key family; not ours.
                        None => continue,
                    };
                    if let Err(e) = handle_expired_timer(&ctx, timer_id.clone()).await {
                        error!("Processing expiry of timer {} failed: {}", timer_id, e);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // The monitor reports anything we dropped here.
                    warn!("Expiry subscription lagged; {} notification(s) missed", missed);
                }
                Err(RecvError::Closed) => {
                    warn!("Expiry subscription closed. TTL scheduler stopping.");
                    break;
                }
            }
        }
    });
}

/// Registers the completion TTL key for a timer. Already-finished timers are
/// skipped.
pub(crate) async fn schedule_timer(ctx: &SandglassContext, timer: &Timer) -> anyhow::Result<()> {
    let now = ctx.sys.now();
    if timer.completed || timer.target_time <= now {
        debug!(
            "Skipping schedule for timer {}: target_time={}, completed={}",
            timer.id, timer.target_time, timer.completed
        );
        return Ok(());
    }

    let ttl = (timer.target_time - now).to_std()?;
    ctx.store
        .set(&schedule_key(&timer.id), &timer.id.as_string(), Some(ttl))
        .await?;
    info!(
        "Timer {} scheduled for completion at {} (in {}s)",
        timer.id,
        timer.target_time,
        ttl.as_secs()
    );
    Ok(())
}

/// Delete-then-set replace. An expiry firing between the two calls finds a
/// completed or rescheduled timer and no-ops; the monitor is the net
/// underneath.
pub(crate) async fn update_timer_schedule(
    ctx: &SandglassContext,
    timer: &Timer,
) -> anyhow::Result<()> {
    ctx.store.delete(&schedule_key(&timer.id)).await?;
    schedule_timer(ctx, timer).await
}

pub(crate) async fn cancel_timer_schedule(
    ctx: &SandglassContext,
    timer_id: &ID,
) -> anyhow::Result<()> {
    ctx.store.delete(&schedule_key(timer_id)).await?;
    debug!("Schedule for timer {} cancelled", timer_id);
    Ok(())
}

/// Runs the completion protocol for one expired schedule key.
///
/// Every server in the fleet executes this for the same notification; the
/// `timer:processing:{id}` mutex elects the single winner. Winner or not,
/// each server leaves a completion-log attempt behind.
pub(crate) async fn handle_expired_timer(
    ctx: &SandglassContext,
    timer_id: ID,
) -> anyhow::Result<()> {
    let notification_received_at = ctx.sys.now();
    let server_id = ctx.config.server_instance_id.clone();
    info!("Schedule key expired for timer {}", timer_id);

    let timer = match ctx.repos.timers.find(&timer_id).await {
        Some(timer) => timer,
        None => {
            warn!("Timer {} not found for expired schedule key", timer_id);
            let mut log =
                CompletionLog::new(timer_id.clone(), &server_id, notification_received_at, None);
            log.mark_processing_started(ctx.sys.now(), false);
            log.mark_failure(ctx.sys.now(), "timer not found");
            ctx.repos.completion_logs.insert(&log).await?;
            return Ok(());
        }
    };

    let mut log = CompletionLog::new(
        timer_id.clone(),
        &server_id,
        notification_received_at,
        Some(timer.target_time),
    );
    ctx.repos.completion_logs.insert(&log).await?;

    let lock_key = processing_key(&timer_id);
    let lock_acquired = ctx
        .store
        .set_if_absent(&lock_key, &server_id, PROCESSING_LOCK_TTL)
        .await?;
    log.mark_processing_started(ctx.sys.now(), lock_acquired);

    if !lock_acquired {
        debug!(
            "Timer {} is being completed by another server. Skipping.",
            timer_id
        );
        log.mark_failure(ctx.sys.now(), "lock not acquired");
        ctx.repos.completion_logs.save(&log).await?;
        return Ok(());
    }

    info!(
        "Completion lock won for timer {} by server {}",
        timer_id, server_id
    );
    ctx.channels.signal_completion(CompletionSignal {
        timer_id: timer_id.clone(),
    });
    log.mark_success(ctx.sys.now());
    let saved = ctx.repos.completion_logs.save(&log).await;

    // Release on every exit path; the TTL is only the crash net.
    if let Err(e) = ctx.store.delete(&lock_key).await {
        error!("Releasing completion lock for timer {} failed: {}", timer_id, e);
    }
    saved?;
    Ok(())
}

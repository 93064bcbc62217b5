use crate::ws::SessionHub;
use sandglass_domain::{BusTopic, EventLog, TimerEvent};
use sandglass_infra::SandglassContext;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Starts one consumer task per bus topic. Every server in the fleet runs
/// these; each filters independently through the presence index and fans
/// matching events out to its local sessions.
pub fn start_bus_consumers(ctx: SandglassContext, hub: Arc<SessionHub>) {
    for topic in BusTopic::all().iter() {
        let topic = *topic;
        let ctx = ctx.clone();
        let hub = hub.clone();
        actix_web::rt::spawn(async move {
            let mut events = ctx.bus.subscribe(topic);
            info!("Bus consumer started for topic {}", topic.as_str());
            loop {
                match events.recv().await {
                    Ok(event) => {
                        // Continue-on-error: a retry could only produce
                        // duplicates and client handlers are idempotent.
                        if let Err(e) = handle_event(&ctx, &hub, &event).await {
                            error!(
                                "Handling {} for timer {} failed: {}",
                                event.event_type(),
                                event.timer_id(),
                                e
                            );
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(
                            "Bus consumer for {} lagged; {} event(s) missed",
                            topic.as_str(),
                            missed
                        );
                    }
                    Err(RecvError::Closed) => {
                        warn!("Bus subscription for {} closed.", topic.as_str());
                        break;
                    }
                }
            }
        });
    }
}

/// The per-event handler: presence filter (with the always-dispatch bypass
/// for owner-critical events), event-log persist, local fan-out.
pub(crate) async fn handle_event(
    ctx: &SandglassContext,
    hub: &SessionHub,
    event: &TimerEvent,
) -> anyhow::Result<()> {
    if !event.always_dispatch() {
        let relevant = ctx
            .presence
            .is_server_relevant(event.timer_id(), &ctx.config.server_instance_id)
            .await?;
        if !relevant {
            debug!(
                "Dropping {} for timer {}: no local viewers",
                event.event_type(),
                event.timer_id()
            );
            return Ok(());
        }
    }

    let log = EventLog::from_event(event, ctx.sys.now());
    if let Err(e) = ctx.repos.event_logs.insert(&log).await {
        // Fan-out still happens; the log is an audit trail, not a gate.
        error!(
            "Persisting event log for {} failed: {}",
            event.event_type(),
            e
        );
    }

    let reached = hub.publish(event.timer_id(), event);
    debug!(
        "Dispatched {} for timer {} to {} local session(s)",
        event.event_type(),
        event.timer_id(),
        reached
    );
    Ok(())
}

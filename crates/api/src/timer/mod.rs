mod change_target_time;
mod complete_timer;
mod create_timer;
mod get_timer;
mod get_timer_history;
mod get_user_timer_history;
mod save_timestamp;
pub mod subscribers;

use crate::shared::usecase::execute;
use actix_web::web;
use change_target_time::change_target_time_controller;
use complete_timer::complete_timer_controller;
use create_timer::create_timer_controller;
use get_timer::{get_timer_by_share_token_controller, get_timer_controller};
use get_timer_history::get_timer_history_controller;
use get_user_timer_history::get_user_timer_history_controller;
use sandglass_infra::SandglassContext;
use save_timestamp::save_timestamp_controller;
use tracing::{error, info};

pub use change_target_time::ChangeTargetTimeUseCase;
pub use complete_timer::{CompleteTimerUseCase, CompletionTrigger};
pub use get_timer::{GetTimerUseCase, TimerLookup};
pub use save_timestamp::SaveTimestampUseCase;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/timers", web::post().to(create_timer_controller));
    // Registered before the plain id route so `shared` never parses as an id.
    cfg.route(
        "/timers/shared/{share_token}",
        web::get().to(get_timer_by_share_token_controller),
    );
    cfg.route("/timers/{timer_id}", web::get().to(get_timer_controller));
    cfg.route(
        "/timers/{timer_id}/target-time",
        web::put().to(change_target_time_controller),
    );
    cfg.route(
        "/timers/{timer_id}/timestamps",
        web::post().to(save_timestamp_controller),
    );
    cfg.route(
        "/timers/{timer_id}/history",
        web::get().to(get_timer_history_controller),
    );
    cfg.route(
        "/timers/{timer_id}/users/{user_id}/history",
        web::get().to(get_user_timer_history_controller),
    );
    cfg.route(
        "/timers/{timer_id}/complete",
        web::post().to(complete_timer_controller),
    );
}

/// Consumes `CompletionSignal`s from the TTL scheduler and applies the
/// completion transaction. The scheduler side holds the fleet-wide mutex
/// while this runs.
pub fn start_completion_listener(ctx: SandglassContext) {
    let mut signals = ctx
        .channels
        .take_completion_signals()
        .expect("Completion signal receiver to be taken only by the completion listener");

    actix_web::rt::spawn(async move {
        info!("Completion listener started.");
        while let Some(signal) = signals.recv().await {
            let timer_id = signal.timer_id.clone();
            let usecase = CompleteTimerUseCase {
                timer_id: signal.timer_id,
                trigger: CompletionTrigger::Scheduler,
            };
            if let Err(e) = execute(usecase, &ctx).await {
                error!("Completing timer {} failed: {:?}", timer_id, e);
            }
        }
    });
}

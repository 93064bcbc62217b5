mod detect_missed_timers;
mod get_completion_stats;

use actix_web::web;
use detect_missed_timers::detect_missed_timers_controller;
use get_completion_stats::get_completion_stats_controller;

pub use detect_missed_timers::DetectMissedTimersUseCase;
pub use get_completion_stats::GetCompletionStatsUseCase;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/monitoring/completion-stats",
        web::get().to(get_completion_stats_controller),
    );
    cfg.route(
        "/monitoring/detect-missed-timers",
        web::post().to(detect_missed_timers_controller),
    );
}

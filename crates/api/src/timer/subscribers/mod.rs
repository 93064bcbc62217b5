use crate::shared::usecase::Subscriber;
use crate::timer::change_target_time::ChangeTargetTimeUseCase;
use crate::timer::complete_timer::CompleteTimerUseCase;
use crate::timer::create_timer::CreateTimerUseCase;
use sandglass_domain::{ScheduleRequest, Timer};
use sandglass_infra::SandglassContext;

/// Registers the completion TTL key for a freshly created timer.
pub struct ScheduleOnTimerCreated;

#[async_trait::async_trait(?Send)]
impl Subscriber<CreateTimerUseCase> for ScheduleOnTimerCreated {
    async fn notify(&self, timer: &Timer, ctx: &SandglassContext) {
        ctx.channels
            .request_schedule(ScheduleRequest::Schedule(timer.clone()));
    }
}

/// Re-registers the completion TTL key after a target change.
pub struct SyncScheduleOnTargetChanged;

#[async_trait::async_trait(?Send)]
impl Subscriber<ChangeTargetTimeUseCase> for SyncScheduleOnTargetChanged {
    async fn notify(
        &self,
        res: &crate::timer::change_target_time::UseCaseRes,
        ctx: &SandglassContext,
    ) {
        ctx.channels
            .request_schedule(ScheduleRequest::Update(res.timer.clone()));
    }
}

/// Drops the completion TTL key once a timer is completed. After a forced
/// completion the pending expiry would otherwise still fire.
pub struct CancelScheduleOnTimerCompleted;

#[async_trait::async_trait(?Send)]
impl Subscriber<CompleteTimerUseCase> for CancelScheduleOnTimerCompleted {
    async fn notify(&self, res: &crate::timer::complete_timer::UseCaseRes, ctx: &SandglassContext) {
        ctx.channels
            .request_schedule(ScheduleRequest::Cancel(res.timer.id.clone()));
    }
}

use crate::shared::entity::ID;
use crate::timer::Timer;

/// Requests flowing from the timer core to the TTL scheduler over an
/// in-process channel. The scheduler and the core never hold references to
/// each other; these messages are the only coupling between them.
#[derive(Debug, Clone)]
pub enum ScheduleRequest {
    Schedule(Timer),
    Update(Timer),
    Cancel(ID),
}

impl ScheduleRequest {
    pub fn timer_id(&self) -> &ID {
        match self {
            Self::Schedule(timer) | Self::Update(timer) => &timer.id,
            Self::Cancel(timer_id) => timer_id,
        }
    }
}

/// Emitted by the TTL scheduler once it has won the per-timer completion
/// mutex; consumed by the timer core, which applies the completion
/// transaction and fans the result out to the fleet.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    pub timer_id: ID,
}

mod completion_log;
mod event;
mod event_log;
mod presence;
mod scheduling;
mod shared;
mod timer;
mod timestamp_mark;

pub use completion_log::{CompletionLog, CompletionStats, MissedCompletionCause};
pub use event::{BusTopic, TimerEvent};
pub use event_log::{EventLog, EVENT_LOG_RETENTION_DAYS};
pub use presence::{derived_user_id, PresenceSession};
pub use scheduling::{CompletionSignal, ScheduleRequest};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use shared::metadata::Metadata;
pub use timer::{Timer, UserRole, TIMER_RETENTION_DAYS};
pub use timestamp_mark::TimestampMark;

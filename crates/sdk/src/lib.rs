mod base;
mod monitoring;
mod status;
mod timer;

use monitoring::MonitoringClient;
use status::StatusClient;
use std::sync::Arc;
use timer::TimerClient;

pub(crate) use base::BaseClient;

pub use base::{APIError, APIResponse};
pub use timer::{ChangeTargetTimeInput, CreateTimerInput, SaveTimestampInput};

/// Sandglass Server SDK
///
/// The SDK contains methods for interacting with the Sandglass server API.
#[derive(Clone)]
pub struct SandglassSDK {
    pub timer: TimerClient,
    pub monitoring: MonitoringClient,
    pub status: StatusClient,
}

impl SandglassSDK {
    pub fn new(address: String) -> Self {
        let base = Arc::new(BaseClient::new(address));
        let timer = TimerClient::new(base.clone());
        let monitoring = MonitoringClient::new(base.clone());
        let status = StatusClient::new(base);

        Self {
            timer,
            monitoring,
            status,
        }
    }
}

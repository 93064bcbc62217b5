use sandglass_utils::create_random_secret;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    /// Unique id of this server process. Every presence record, completion
    /// log and bus consumer group is keyed on it.
    pub server_instance_id: String,
    /// Port for the application to run on
    pub port: usize,
    /// How far back the reconciliation monitor looks for timers whose target
    /// passed without a successful completion, in minutes.
    pub missed_timer_window_minutes: i64,
}

impl Config {
    pub fn new() -> Self {
        let server_instance_id = match std::env::var("SERVER_INSTANCE_ID") {
            Ok(id) => id,
            Err(_) => {
                let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "server".into());
                let id = format!("{}-{}-{}", host, std::process::id(), create_random_secret(6));
                info!(
                    "Did not find SERVER_INSTANCE_ID environment variable. Generated: {}",
                    id
                );
                id
            }
        };

        let default_port = "5000";
        let port = std::env::var("PORT").unwrap_or_else(|_| default_port.into());
        let port = match port.parse::<usize>() {
            Ok(port) => port,
            Err(_) => {
                warn!(
                    "The given PORT: {} is not valid, falling back to the default port: {}.",
                    port, default_port
                );
                default_port.parse::<usize>().unwrap()
            }
        };

        Self {
            server_instance_id,
            port,
            missed_timer_window_minutes: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

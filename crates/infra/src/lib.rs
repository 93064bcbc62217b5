mod bus;
mod channels;
mod config;
mod presence;
mod repos;
mod store;
mod system;

use std::sync::Arc;
use tracing::{info, warn};

pub use bus::{IEventBus, InMemoryEventBus, KafkaEventBus};
pub use channels::CoreChannels;
pub use config::Config;
pub use presence::{
    PresenceIndex, CONNECTED_SERVER_TTL, ONLINE_USERS_TTL, SERVER_USERS_TTL, SESSION_TTL,
};
pub use repos::{ICompletionLogRepo, IEventLogRepo, ITimerRepo, ITimestampRepo, Repos};
pub use store::{IKeyValueStore, InMemoryKeyValueStore, RedisKeyValueStore};
pub use system::ISys;
use system::RealSys;

#[derive(Clone)]
pub struct SandglassContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub store: Arc<dyn IKeyValueStore>,
    pub presence: PresenceIndex,
    pub bus: Arc<dyn IEventBus>,
    pub channels: Arc<CoreChannels>,
}

impl SandglassContext {
    pub fn create_inmemory() -> Self {
        let store: Arc<dyn IKeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        Self {
            repos: Repos::create_inmemory(),
            config: Config::new(),
            sys: Arc::new(RealSys {}),
            presence: PresenceIndex::new(store.clone()),
            store,
            bus: Arc::new(InMemoryEventBus::new()),
            channels: Arc::new(CoreChannels::new()),
        }
    }
}

/// Will setup the correct Infra Context given the environment.
///
/// Each backend is selected independently: the primary store, the shared
/// store and the fleet bus fall back to their in-memory counterparts when
/// their env var is absent. In-memory backends only coordinate within one
/// process and should not be used in a multi-server deployment.
pub async fn setup_context() -> SandglassContext {
    const PSQL_CONNECTION_STRING: &str = "POSTGRES_CONNECTION_STRING";
    const REDIS_URI: &str = "REDIS_URI";
    const KAFKA_BOOTSTRAP_SERVERS: &str = "KAFKA_BOOTSTRAP_SERVERS";

    let config = Config::new();

    let repos = match std::env::var(PSQL_CONNECTION_STRING) {
        Ok(connection_string) => {
            info!("{} env var was provided. Going to use postgres.", PSQL_CONNECTION_STRING);
            Repos::create_postgres(&connection_string)
                .await
                .expect("Postgres credentials must be valid")
        }
        Err(_) => {
            warn!(
                "{} env var was not provided. Going to use inmemory repos. This should only be used during testing!",
                PSQL_CONNECTION_STRING
            );
            Repos::create_inmemory()
        }
    };

    let store: Arc<dyn IKeyValueStore> = match std::env::var(REDIS_URI) {
        Ok(uri) => {
            info!("{} env var was provided. Going to use redis.", REDIS_URI);
            Arc::new(
                RedisKeyValueStore::connect(&uri)
                    .await
                    .expect("Redis uri must be valid"),
            )
        }
        Err(_) => {
            warn!(
                "{} env var was not provided. Going to use the inmemory store. This should only be used during testing!",
                REDIS_URI
            );
            Arc::new(InMemoryKeyValueStore::new())
        }
    };

    let bus: Arc<dyn IEventBus> = match std::env::var(KAFKA_BOOTSTRAP_SERVERS) {
        Ok(brokers) => {
            info!("{} env var was provided. Going to use kafka.", KAFKA_BOOTSTRAP_SERVERS);
            Arc::new(
                KafkaEventBus::connect(&brokers, &config.server_instance_id)
                    .expect("Kafka bootstrap servers must be valid"),
            )
        }
        Err(_) => {
            warn!(
                "{} env var was not provided. Going to use the inmemory bus. This should only be used during testing!",
                KAFKA_BOOTSTRAP_SERVERS
            );
            Arc::new(InMemoryEventBus::new())
        }
    };

    SandglassContext {
        repos,
        config,
        sys: Arc::new(RealSys {}),
        presence: PresenceIndex::new(store.clone()),
        store,
        bus,
        channels: Arc::new(CoreChannels::new()),
    }
}

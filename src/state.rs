use crate::application::ports::offline_store::OfflineStore;
use crate::application::ports::reachability::ReachabilityProbe;
use crate::application::services::{
    ActionExecutor, OfflineService, RemoteActionExecutor, SyncEngine,
};
use crate::infrastructure::database::{Database, DbPool};
use crate::infrastructure::network::{
    HttpPetSafetyApi, ReachabilityMonitor, TcpReachabilityProbe,
};
use crate::infrastructure::offline::SqliteOfflineStore;
use crate::shared::config::AppConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Everything the client needs to queue, show and replay offline actions.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub store: Arc<dyn OfflineStore>,
    pub api: Arc<HttpPetSafetyApi>,
    pub reachability: Arc<ReachabilityMonitor>,
    pub probe: Arc<dyn ReachabilityProbe>,
    pub sync_engine: Arc<SyncEngine>,
    pub offline_service: Arc<OfflineService>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;

        let db_pool =
            Database::initialize(&config.database.url, config.database.max_connections).await?;
        let store: Arc<dyn OfflineStore> = Arc::new(SqliteOfflineStore::new(db_pool.clone()));

        let probe: Arc<dyn ReachabilityProbe> = Arc::new(TcpReachabilityProbe::new(
            config.reachability.probe_host.clone(),
            Duration::from_millis(config.reachability.probe_timeout_ms),
        ));
        let reachability = Arc::new(ReachabilityMonitor::probe_initial(probe.as_ref()).await);

        let api = Arc::new(HttpPetSafetyApi::new(&config.api)?);
        let executor: Arc<dyn ActionExecutor> = Arc::new(RemoteActionExecutor::new(api.clone()));

        let sync_engine = Arc::new(SyncEngine::new(
            store.clone(),
            executor.clone(),
            reachability.clone(),
        ));
        let offline_service = Arc::new(OfflineService::new(
            store.clone(),
            executor,
            reachability.clone(),
            config.sync.attention_retry_threshold,
        ));

        info!("Offline sync state initialized");

        Ok(Self {
            config,
            db_pool,
            store,
            api,
            reachability,
            probe,
            sync_engine,
            offline_service,
        })
    }

    /// Spawns probe polling, the reconnect listener and, when enabled, periodic sync.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let mut handles = vec![
            self.reachability.spawn_polling(
                self.probe.clone(),
                Duration::from_secs(self.config.reachability.probe_interval_secs),
            ),
            self.sync_engine.spawn_connectivity_listener(),
        ];
        if self.config.sync.auto_sync {
            handles.push(
                self.sync_engine
                    .schedule_sync(Duration::from_secs(self.config.sync.sync_interval_secs)),
            );
        }
        info!(tasks = handles.len(), "Offline sync background tasks started");
        handles
    }
}

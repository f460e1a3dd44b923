use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::clients::{SteamCatalog, SteamClient};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AdminKeyService, LibraryService, PriceService, SeaOrmAdminKeyService, SeaOrmLibraryService,
    SyncService,
};

/// Build the HTTP client shared by every outbound Steam call so connections
/// are pooled.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("Steamboat/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub steam: Arc<dyn SteamCatalog>,

    pub admin_keys: Arc<dyn AdminKeyService>,

    pub sync: Arc<SyncService>,

    pub prices: Arc<PriceService>,

    pub library: Arc<dyn LibraryService>,

    /// Result of the last bootstrap run, flipped to true by provisioning.
    ready: Arc<AtomicBool>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::from_store(config, store)
    }

    /// Wires the services over an already-open store with the real Steam client.
    pub fn from_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(config.steam.request_timeout_seconds)?;
        let steam: Arc<dyn SteamCatalog> =
            Arc::new(SteamClient::with_shared_client(http_client, &config.steam));

        Ok(Self::with_catalog(config, store, steam))
    }

    /// Same as [`SharedState::from_store`] with any catalog implementation.
    #[must_use]
    pub fn with_catalog(config: Config, store: Store, steam: Arc<dyn SteamCatalog>) -> Self {
        let admin_keys = Arc::new(SeaOrmAdminKeyService::new(
            store.clone(),
            config.security.clone(),
        ));

        let sync = Arc::new(SyncService::new(
            store.clone(),
            steam.clone(),
            config.steam.api_key.clone(),
            config.scheduler.max_concurrent_syncs,
        ));

        let prices = Arc::new(PriceService::new(store.clone(), steam.clone()));

        let library = Arc::new(SeaOrmLibraryService::new(store.clone()));

        Self {
            config: Arc::new(config),
            store,
            steam,
            admin_keys,
            sync,
            prices,
            library,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }
}

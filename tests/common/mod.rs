//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use steamboat::clients::{OwnedGameSnapshot, PriceOverview, SteamCatalog, SteamError};
use steamboat::config::Config;
use steamboat::db::{SteamAccount, SteamProfile, Store, User};

/// Config pointing at a fresh temp-file database, with hashing params cheap
/// enough for tests.
pub fn test_config(db_path: &Path) -> Config {
    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.steam.api_key = "test-api-key".to_string();
    config.scheduler.enabled = false;
    config.security.argon2_memory_cost_kib = 64;
    config.security.argon2_time_cost = 1;
    config.security.argon2_parallelism = 1;
    config
}

/// A migrated temp-file database. The file and its WAL siblings are removed
/// when this is dropped, so keep it alive for the whole test.
pub struct TestDb {
    pub store: Store,
    pub config: Config,
    path: PathBuf,
}

impl Drop for TestDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

pub async fn test_store(name: &str) -> TestDb {
    let path = std::env::temp_dir().join(format!(
        "steamboat-{name}-test-{}.db",
        uuid::Uuid::new_v4()
    ));
    let config = test_config(&path);
    let store = Store::new(&config.general.database_path)
        .await
        .expect("Failed to open test database");

    TestDb {
        store,
        config,
        path,
    }
}

/// Writes a system flag directly, bypassing the bootstrap and provisioning
/// paths that normally own it.
pub async fn force_flag(store: &Store, key: &str, value: &str) {
    let now = chrono::Utc::now().to_rfc3339();
    store
        .conn
        .execute(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "INSERT INTO system_flags (key, value, created_at, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key.into(), value.into(), now.clone().into(), now.into()],
        ))
        .await
        .expect("Failed to write system flag");
}

pub fn snapshot(app_id: i32, name: &str, playtime_forever: i32) -> OwnedGameSnapshot {
    OwnedGameSnapshot {
        app_id,
        name: name.to_string(),
        icon_hash: Some(format!("icon{app_id}")),
        playtime_forever,
        playtime_recent: 0,
        playtime_windows: playtime_forever,
        playtime_mac: 0,
        playtime_linux: 0,
        last_played: Some(1_700_000_000),
    }
}

pub fn price(currency: &str, initial: i32, final_price: i32) -> PriceOverview {
    PriceOverview {
        currency: currency.to_string(),
        initial,
        final_price,
        discount_percent: if initial > 0 {
            100 - final_price * 100 / initial
        } else {
            0
        },
    }
}

pub async fn seed_user(store: &Store, discord_id: &str) -> User {
    store
        .upsert_discord_user(discord_id, &format!("user-{discord_id}"), None)
        .await
        .expect("Failed to seed user")
}

pub async fn seed_account(store: &Store, user_id: i32, steam_id: &str) -> SteamAccount {
    store
        .insert_steam_account(user_id, &profile(steam_id))
        .await
        .expect("Failed to seed Steam account")
}

pub fn profile(steam_id: &str) -> SteamProfile {
    SteamProfile {
        steam_id: steam_id.to_string(),
        steam_username: format!("steam-{steam_id}"),
        steam_avatar: None,
        profile_url: None,
    }
}

/// In-process stand-in for the Steam Web API.
#[derive(Default)]
pub struct FakeCatalog {
    libraries: Mutex<HashMap<String, Vec<OwnedGameSnapshot>>>,
    failing_accounts: Mutex<HashSet<String>>,
    prices: Mutex<HashMap<i32, PriceOverview>>,
    fail_prices: AtomicBool,
    price_calls: AtomicUsize,
    requested_price_ids: Mutex<Vec<Vec<i32>>>,
}

impl FakeCatalog {
    pub fn set_library(&self, steam_id: &str, games: Vec<OwnedGameSnapshot>) {
        self.libraries
            .lock()
            .unwrap()
            .insert(steam_id.to_string(), games);
    }

    pub fn fail_account(&self, steam_id: &str) {
        self.failing_accounts
            .lock()
            .unwrap()
            .insert(steam_id.to_string());
    }

    pub fn set_price(&self, app_id: i32, price: PriceOverview) {
        self.prices.lock().unwrap().insert(app_id, price);
    }

    pub fn fail_prices(&self, fail: bool) {
        self.fail_prices.store(fail, Ordering::SeqCst);
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn requested_price_ids(&self) -> Vec<Vec<i32>> {
        self.requested_price_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl SteamCatalog for FakeCatalog {
    async fn owned_games(
        &self,
        steam_id: &str,
        _api_key: &str,
    ) -> Result<Vec<OwnedGameSnapshot>, SteamError> {
        if self.failing_accounts.lock().unwrap().contains(steam_id) {
            return Err(SteamError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }

        Ok(self
            .libraries
            .lock()
            .unwrap()
            .get(steam_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn app_prices(
        &self,
        app_ids: &[i32],
    ) -> Result<HashMap<i32, Option<PriceOverview>>, SteamError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_price_ids
            .lock()
            .unwrap()
            .push(app_ids.to_vec());

        if self.fail_prices.load(Ordering::SeqCst) {
            return Err(SteamError::Status {
                status: 429,
                body: "rate limited".to_string(),
            });
        }

        let prices = self.prices.lock().unwrap();
        Ok(app_ids
            .iter()
            .map(|id| (*id, prices.get(id).cloned()))
            .collect())
    }
}

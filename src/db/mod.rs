use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::clients::{OwnedGameSnapshot, PriceOverview};

pub mod migrator;
pub mod repositories;

pub use repositories::admin_key::{AdminKey, CandidateKey};
pub use repositories::game::{Game, GamePrice};
pub use repositories::owned_game::{GameOwner, OwnedGame, OwnedGameWithGame};
pub use repositories::steam_account::{SteamAccount, SteamProfile};
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn admin_key_repo(&self) -> repositories::admin_key::AdminKeyRepository {
        repositories::admin_key::AdminKeyRepository::new(self.conn.clone())
    }

    fn system_flag_repo(&self) -> repositories::system_flag::SystemFlagRepository {
        repositories::system_flag::SystemFlagRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn steam_account_repo(&self) -> repositories::steam_account::SteamAccountRepository {
        repositories::steam_account::SteamAccountRepository::new(self.conn.clone())
    }

    fn game_repo(&self) -> repositories::game::GameRepository {
        repositories::game::GameRepository::new(self.conn.clone())
    }

    fn owned_game_repo(&self) -> repositories::owned_game::OwnedGameRepository {
        repositories::owned_game::OwnedGameRepository::new(self.conn.clone())
    }

    // Administrator keys and system flags

    pub async fn get_system_flag(&self, key: &str) -> Result<Option<String>> {
        self.system_flag_repo().get(key).await
    }

    pub async fn count_permanent_admin_keys(&self) -> Result<u64> {
        self.admin_key_repo().count_permanent().await
    }

    pub async fn count_admin_keys(&self) -> Result<u64> {
        self.admin_key_repo().count().await
    }

    pub async fn list_admin_keys(&self) -> Result<Vec<AdminKey>> {
        self.admin_key_repo().list().await
    }

    pub async fn list_candidate_admin_keys(&self) -> Result<Vec<CandidateKey>> {
        self.admin_key_repo().list_candidates().await
    }

    pub async fn consume_one_time_admin_key(&self, id: i32) -> Result<bool> {
        self.admin_key_repo().consume_one_time(id).await
    }

    pub async fn touch_admin_key(&self, id: i32) -> Result<bool> {
        self.admin_key_repo().touch(id).await
    }

    pub async fn issue_first_launch_key(&self, name: &str, secret_hash: String) -> Result<i32> {
        self.admin_key_repo()
            .issue_first_launch_key(name, secret_hash)
            .await
    }

    pub async fn provision_permanent_admin_key(
        &self,
        name: &str,
        secret_hash: String,
        redeeming: Option<i32>,
    ) -> Result<Option<AdminKey>> {
        self.admin_key_repo()
            .provision_permanent(name, secret_hash, redeeming)
            .await
    }

    // Users

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_discord_id(&self, discord_id: &str) -> Result<Option<User>> {
        self.user_repo().get_by_discord_id(discord_id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn upsert_discord_user(
        &self,
        discord_id: &str,
        username: &str,
        avatar: Option<&str>,
    ) -> Result<User> {
        self.user_repo()
            .upsert_discord_user(discord_id, username, avatar)
            .await
    }

    // Steam accounts

    pub async fn get_steam_account(&self, id: i32) -> Result<Option<SteamAccount>> {
        self.steam_account_repo().get(id).await
    }

    pub async fn get_steam_account_by_steam_id(
        &self,
        steam_id: &str,
    ) -> Result<Option<SteamAccount>> {
        self.steam_account_repo().get_by_steam_id(steam_id).await
    }

    pub async fn list_steam_accounts_for_user(&self, user_id: i32) -> Result<Vec<SteamAccount>> {
        self.steam_account_repo().list_for_user(user_id).await
    }

    pub async fn list_all_steam_accounts(&self) -> Result<Vec<SteamAccount>> {
        self.steam_account_repo().list_all().await
    }

    pub async fn insert_steam_account(
        &self,
        user_id: i32,
        profile: &SteamProfile,
    ) -> Result<SteamAccount> {
        self.steam_account_repo().insert(user_id, profile).await
    }

    pub async fn update_steam_profile(&self, id: i32, profile: &SteamProfile) -> Result<()> {
        self.steam_account_repo().update_profile(id, profile).await
    }

    pub async fn delete_steam_account(&self, id: i32) -> Result<bool> {
        self.steam_account_repo().delete(id).await
    }

    // Catalog

    pub async fn get_game(&self, app_id: i32) -> Result<Option<Game>> {
        self.game_repo().get(app_id).await
    }

    pub async fn list_games(&self) -> Result<Vec<Game>> {
        self.game_repo().list().await
    }

    pub async fn list_games_missing_prices(&self, max_attempts: i32) -> Result<Vec<i32>> {
        self.game_repo().list_missing_prices(max_attempts).await
    }

    pub async fn record_game_price(&self, app_id: i32, price: &PriceOverview) -> Result<()> {
        self.game_repo().record_price(app_id, price).await
    }

    pub async fn increment_price_attempts(&self, app_ids: &[i32]) -> Result<u64> {
        self.game_repo().increment_price_attempts(app_ids).await
    }

    // Ownership

    pub async fn reconcile_owned_games(
        &self,
        account_id: i32,
        snapshot: &[OwnedGameSnapshot],
    ) -> Result<()> {
        self.owned_game_repo().reconcile(account_id, snapshot).await
    }

    pub async fn list_owned_games(&self, account_id: i32) -> Result<Vec<OwnedGame>> {
        self.owned_game_repo().list_for_account(account_id).await
    }

    pub async fn visible_owned_games_with_games(
        &self,
        account_ids: &[i32],
    ) -> Result<Vec<OwnedGameWithGame>> {
        self.owned_game_repo().visible_with_games(account_ids).await
    }

    pub async fn set_game_hidden(&self, account_id: i32, app_id: i32, hidden: bool) -> Result<u64> {
        self.owned_game_repo()
            .set_hidden(account_id, app_id, hidden)
            .await
    }

    pub async fn game_owners(&self, app_id: i32) -> Result<Vec<GameOwner>> {
        self.owned_game_repo().owners_of(app_id).await
    }
}

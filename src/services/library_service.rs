//! Domain service for user libraries: linked Steam accounts, visibility,
//! library value and comparisons between users.

use serde::Serialize;
use thiserror::Error;

use crate::db::{Game, OwnedGameWithGame, SteamAccount, SteamProfile, User};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("User {0} not found")]
    UserNotFound(i32),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for LibraryError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LibraryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

#[derive(Debug, Clone)]
pub enum LinkOutcome {
    /// `is_new` is false when the caller re-linked an account they already
    /// own and only the profile was refreshed.
    Linked { account: SteamAccount, is_new: bool },
    AlreadyLinkedToAnotherUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlinkOutcome {
    Unlinked,
    NotFoundOrUnauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityOutcome {
    Updated,
    NotFoundOrUnauthorized,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GameComparison {
    pub shared: Vec<Game>,
    pub only_current_user: Vec<Game>,
    pub only_target_user: Vec<Game>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DiscordCompareOutcome {
    NotFound,
    IsSelf,
    Found {
        shared_games: Vec<Game>,
        shared_count: usize,
        current_user_game_count: usize,
        target_user_game_count: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrencyTotal {
    pub currency: String,
    /// Minor units (cents)
    pub total_initial: i64,
    pub total_final: i64,
    pub game_count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LibraryValue {
    pub totals: Vec<CurrencyTotal>,
    pub unpriced_games: usize,
}

#[async_trait::async_trait]
pub trait LibraryService: Send + Sync {
    /// Records a Discord identity handed over by the auth gateway.
    async fn register_user(
        &self,
        discord_id: &str,
        username: &str,
        avatar: Option<&str>,
    ) -> Result<User, LibraryError>;

    async fn link_steam_account(
        &self,
        user_id: i32,
        profile: &SteamProfile,
    ) -> Result<LinkOutcome, LibraryError>;

    async fn linked_accounts(&self, user_id: i32) -> Result<Vec<SteamAccount>, LibraryError>;

    async fn unlink_steam_account(
        &self,
        user_id: i32,
        steam_account_id: i32,
    ) -> Result<UnlinkOutcome, LibraryError>;

    async fn set_game_visibility(
        &self,
        user_id: i32,
        steam_account_id: i32,
        app_id: i32,
        hidden: bool,
    ) -> Result<VisibilityOutcome, LibraryError>;

    /// Visible games across all of the user's linked accounts.
    async fn visible_games(&self, user_id: i32) -> Result<Vec<OwnedGameWithGame>, LibraryError>;

    /// Another user's visible games. Empty when the user is unknown or has no
    /// linked accounts.
    async fn user_visible_games(
        &self,
        user_id: i32,
    ) -> Result<Vec<OwnedGameWithGame>, LibraryError>;

    async fn library_value(&self, user_id: i32) -> Result<LibraryValue, LibraryError>;

    async fn compare_users(
        &self,
        current_user_id: i32,
        target_user_id: i32,
    ) -> Result<GameComparison, LibraryError>;

    async fn compare_by_discord_id(
        &self,
        current_user_id: i32,
        discord_id: &str,
    ) -> Result<DiscordCompareOutcome, LibraryError>;

    /// Same as [`LibraryService::compare_by_discord_id`] but with both sides
    /// named by Discord id, for bot and admin callers.
    async fn compare_discord_users(
        &self,
        invoker_discord_id: &str,
        target_discord_id: &str,
    ) -> Result<DiscordCompareOutcome, LibraryError>;
}

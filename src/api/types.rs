use serde::{Deserialize, Serialize};

use crate::db::{AdminKey, Game, GameOwner, SteamAccount, User};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ready: bool,
    pub db_ready: bool,
    pub version: String,
    pub uptime: u64,
}

#[derive(Debug, Deserialize)]
pub struct ProvisionKeyRequest {
    pub name: String,
}

/// The only response that ever carries a plaintext administrator secret.
#[derive(Debug, Serialize)]
pub struct ProvisionedKeyResponse {
    pub key: AdminKey,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct SyncAccountResponse {
    pub account_id: i32,
    pub games_synced: usize,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub discord_id: String,
    pub discord_username: String,
    pub discord_avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub discord_id: Option<String>,
    pub steam_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserDetailDto {
    #[serde(flatten)]
    pub user: User,
    pub steam_accounts: Vec<SteamAccount>,
}

#[derive(Debug, Serialize)]
pub struct GameDetailDto {
    #[serde(flatten)]
    pub game: Game,
    pub owners: Vec<GameOwner>,
}

#[derive(Debug, Deserialize)]
pub struct CompareDiscordUsersRequest {
    pub invoker_discord_id: String,
    pub target_discord_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub steam_account_id: i32,
    pub app_id: i32,
    pub hidden: bool,
}

#[derive(Debug, Serialize)]
pub struct LinkAccountResponse {
    pub account: SteamAccount,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

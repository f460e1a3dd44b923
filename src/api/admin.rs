//! Administrator endpoints: key provisioning, manual sync triggers and the
//! read-only user/game views used by the bot and operators.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState, CompareDiscordUsersRequest, GameDetailDto,
    ProvisionKeyRequest, ProvisionedKeyResponse, RegisterUserRequest, SyncAccountResponse,
    UserDetailDto, UserSearchQuery,
};
use crate::db::{AdminKey, Game, User};
use crate::services::{DiscordCompareOutcome, PriceBackfillResult, SyncAllResult, VerifiedKey};

// ============================================================================
// Keys
// ============================================================================

/// `POST /api/admin/keys`
///
/// Allowed before setup is complete. Presenting the one-time key redeems it
/// for the new permanent key. Marks the service ready on success.
pub async fn provision_key(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<VerifiedKey>,
    Json(payload): Json<ProvisionKeyRequest>,
) -> Result<Json<ApiResponse<ProvisionedKeyResponse>>, ApiError> {
    let keys = &state.shared.admin_keys;
    let provisioned = if caller.one_time_use {
        keys.redeem(caller.id, &payload.name).await?
    } else {
        keys.provision(&payload.name).await?
    };
    state.shared.set_ready(true);

    Ok(Json(ApiResponse::success(ProvisionedKeyResponse {
        key: provisioned.key,
        secret: provisioned.secret.into_plaintext(),
    })))
}

/// `GET /api/admin/keys`
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<AdminKey>>>, ApiError> {
    let keys = state.shared.admin_keys.list().await?;
    Ok(Json(ApiResponse::success(keys)))
}

// ============================================================================
// Sync
// ============================================================================

/// `POST /api/admin/steam/accounts/{id}/sync`
pub async fn sync_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<i32>,
) -> Result<Json<ApiResponse<SyncAccountResponse>>, ApiError> {
    let games_synced = state.shared.sync.sync_account_by_id(account_id).await?;

    Ok(Json(ApiResponse::success(SyncAccountResponse {
        account_id,
        games_synced,
    })))
}

/// `POST /api/admin/steam/sync-all`
pub async fn sync_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SyncAllResult>>, ApiError> {
    let result = state.shared.sync.sync_all().await?;
    Ok(Json(ApiResponse::success(result)))
}

/// `POST /api/admin/steam/sync-prices`
pub async fn sync_prices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<PriceBackfillResult>>, ApiError> {
    let result = state.shared.prices.backfill_missing_prices().await?;
    Ok(Json(ApiResponse::success(result)))
}

// ============================================================================
// Users
// ============================================================================

/// `POST /api/admin/users`
///
/// Called by the auth gateway after a Discord sign-in.
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state
        .shared
        .library
        .register_user(
            &payload.discord_id,
            &payload.discord_username,
            payload.discord_avatar.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(user)))
}

/// `GET /api/admin/users`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let users = state.store().list_users().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// `GET /api/admin/users/{id}`
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<UserDetailDto>>, ApiError> {
    let user = state
        .store()
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", user_id))?;

    let steam_accounts = state.store().list_steam_accounts_for_user(user_id).await?;

    Ok(Json(ApiResponse::success(UserDetailDto {
        user,
        steam_accounts,
    })))
}

/// `GET /api/admin/users/search?discord_id=..` or `?steam_id=..`
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let user = match (query.discord_id.as_deref(), query.steam_id.as_deref()) {
        (Some(discord_id), _) => state.store().get_user_by_discord_id(discord_id).await?,
        (None, Some(steam_id)) => {
            match state.store().get_steam_account_by_steam_id(steam_id).await? {
                Some(account) => state.store().get_user(account.user_id).await?,
                None => None,
            }
        }
        (None, None) => {
            return Err(ApiError::validation(
                "Either discord_id or steam_id is required",
            ));
        }
    };

    Ok(Json(ApiResponse::success(user.into_iter().collect())))
}

/// `POST /api/admin/compare`
pub async fn compare_discord_users(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CompareDiscordUsersRequest>,
) -> Result<Json<ApiResponse<DiscordCompareOutcome>>, ApiError> {
    let outcome = state
        .shared
        .library
        .compare_discord_users(&payload.invoker_discord_id, &payload.target_discord_id)
        .await?;

    Ok(Json(ApiResponse::success(outcome)))
}

// ============================================================================
// Games
// ============================================================================

/// `GET /api/admin/games`
pub async fn list_games(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Game>>>, ApiError> {
    let games = state.store().list_games().await?;
    Ok(Json(ApiResponse::success(games)))
}

/// `GET /api/admin/games/{app_id}`
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<i32>,
) -> Result<Json<ApiResponse<GameDetailDto>>, ApiError> {
    let game = state
        .store()
        .get_game(app_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Game", app_id))?;

    let owners = state.store().game_owners(app_id).await?;

    Ok(Json(ApiResponse::success(GameDetailDto { game, owners })))
}

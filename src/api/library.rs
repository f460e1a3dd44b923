use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, MessageResponse, VisibilityRequest};
use crate::db::OwnedGameWithGame;
use crate::services::{DiscordCompareOutcome, GameComparison, LibraryValue, VisibilityOutcome};

pub async fn list_games(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<Vec<OwnedGameWithGame>>>, ApiError> {
    let games = state.shared.library.visible_games(user_id).await?;
    Ok(Json(ApiResponse::success(games)))
}

/// `GET /api/library/users/{user_id}/games`
pub async fn list_user_games(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    Path(target_user_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<OwnedGameWithGame>>>, ApiError> {
    let games = state
        .shared
        .library
        .user_visible_games(target_user_id)
        .await?;
    Ok(Json(ApiResponse::success(games)))
}

pub async fn get_value(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<LibraryValue>>, ApiError> {
    let value = state.shared.library.library_value(user_id).await?;
    Ok(Json(ApiResponse::success(value)))
}

pub async fn compare_with_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(target_user_id): Path<i32>,
) -> Result<Json<ApiResponse<GameComparison>>, ApiError> {
    let comparison = state
        .shared
        .library
        .compare_users(user_id, target_user_id)
        .await?;
    Ok(Json(ApiResponse::success(comparison)))
}

pub async fn compare_with_discord_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(discord_id): Path<String>,
) -> Result<Json<ApiResponse<DiscordCompareOutcome>>, ApiError> {
    let outcome = state
        .shared
        .library
        .compare_by_discord_id(user_id, &discord_id)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn set_visibility(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<VisibilityRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let outcome = state
        .shared
        .library
        .set_game_visibility(
            user_id,
            payload.steam_account_id,
            payload.app_id,
            payload.hidden,
        )
        .await?;

    match outcome {
        VisibilityOutcome::Updated => Ok(Json(ApiResponse::success(MessageResponse {
            message: "Visibility updated".to_string(),
        }))),
        VisibilityOutcome::NotFoundOrUnauthorized => Err(ApiError::NotFound(
            "Game not found or unauthorized".to_string(),
        )),
    }
}

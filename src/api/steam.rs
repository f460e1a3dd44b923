use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, LinkAccountResponse, MessageResponse};
use crate::db::{SteamAccount, SteamProfile};
use crate::services::{LinkOutcome, UnlinkOutcome};

pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<Vec<SteamAccount>>>, ApiError> {
    let accounts = state.shared.library.linked_accounts(user_id).await?;
    Ok(Json(ApiResponse::success(accounts)))
}

/// The profile is forwarded by the auth gateway after Steam sign-in.
pub async fn link_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(profile): Json<SteamProfile>,
) -> Result<Json<ApiResponse<LinkAccountResponse>>, ApiError> {
    match state
        .shared
        .library
        .link_steam_account(user_id, &profile)
        .await?
    {
        LinkOutcome::Linked { account, is_new } => Ok(Json(ApiResponse::success(
            LinkAccountResponse { account, is_new },
        ))),
        LinkOutcome::AlreadyLinkedToAnotherUser => Err(ApiError::Conflict(
            "Steam account is already linked to another user".to_string(),
        )),
    }
}

pub async fn unlink_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(account_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    match state
        .shared
        .library
        .unlink_steam_account(user_id, account_id)
        .await?
    {
        UnlinkOutcome::Unlinked => Ok(Json(ApiResponse::success(MessageResponse {
            message: "Steam account unlinked".to_string(),
        }))),
        UnlinkOutcome::NotFoundOrUnauthorized => Err(ApiError::NotFound(
            "Account not found or unauthorized".to_string(),
        )),
    }
}

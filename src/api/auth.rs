use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::services::VerifiedKey;

/// Administrator authentication. Accepts:
/// 1. `X-Api-Key` header
/// 2. `Authorization: Bearer <key>` header
///
/// Only permanent keys pass. A one-time key is refused without being
/// consumed; it can only be redeemed through [`provisioning_middleware`].
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = identify(&state, &headers).await?;

    if key.one_time_use {
        return Err(ApiError::Unauthorized(
            "One-time administrator key can only provision a permanent key".to_string(),
        ));
    }

    record_permanent_use(&state, &key).await?;
    request.extensions_mut().insert(key);
    Ok(next.run(request).await)
}

/// Authentication for `POST /api/admin/keys`. Accepts permanent keys and the
/// unused one-time key. The one-time key is left untouched here; the handler
/// consumes it together with the permanent key it creates.
pub async fn provisioning_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = identify(&state, &headers).await?;

    if !key.one_time_use {
        record_permanent_use(&state, &key).await?;
    }

    request.extensions_mut().insert(key);
    Ok(next.run(request).await)
}

async fn identify(state: &AppState, headers: &HeaderMap) -> Result<VerifiedKey, ApiError> {
    let Some(presented) = extract_api_key(headers) else {
        return Err(ApiError::Unauthorized(
            "Administrator key required".to_string(),
        ));
    };

    let key = state
        .shared
        .admin_keys
        .identify(&presented)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid administrator key".to_string()))?;

    tracing::Span::current().record("user_id", format!("admin:{}", key.id));
    Ok(key)
}

async fn record_permanent_use(state: &AppState, key: &VerifiedKey) -> Result<(), ApiError> {
    if state.shared.admin_keys.mark_used(key.id, false).await? {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(
            "Invalid administrator key".to_string(),
        ))
    }
}

/// Rejects requests with 503 until bootstrap (or provisioning) has reported
/// the service ready. Layered outside [`admin_middleware`] so a refused
/// request never touches a key.
pub async fn require_ready(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.shared.is_ready() {
        return ApiError::ServiceUnavailable(
            "Administrator setup has not been completed".to_string(),
        )
        .into_response();
    }

    next.run(request).await
}

/// Extract the administrator key from headers
fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.trim().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

/// The end user as identified by the upstream auth gateway, which sets the
/// configured identity header to the local user id.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i32);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = state.shared.config.server.user_header.as_str();

        let user_id = parts
            .headers
            .get(header)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i32>().ok())
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

        if state.store().get_user(user_id).await?.is_none() {
            return Err(ApiError::Unauthorized("Unknown user".to_string()));
        }

        tracing::Span::current().record("user_id", format!("user:{user_id}"));
        Ok(Self(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_key_header_takes_precedence_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", HeaderValue::from_static("from-header"));
        headers.insert("Authorization", HeaderValue::from_static("Bearer from-bearer"));

        assert_eq!(extract_api_key(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn bearer_token_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer  abc "));

        assert_eq!(extract_api_key(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));

        assert_eq!(extract_api_key(&headers), None);
    }
}

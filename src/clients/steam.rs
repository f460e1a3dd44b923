//! Steam Web API and storefront client.
//!
//! Two lookups are used: `IPlayerService/GetOwnedGames` for an account's library
//! and the storefront `appdetails` endpoint filtered to `price_overview`.
//! Whole-response shape problems are errors; a single malformed entry is
//! logged and treated as missing.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::SteamConfig;

const ICON_BASE: &str = "https://media.steampowered.com/steamcommunity/public/images/apps";
const HEADER_BASE: &str = "https://steamcdn-a.akamaihd.net/steam/apps";

/// Longest error body kept from a non-2xx response.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum SteamError {
    #[error("Steam request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Steam returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected Steam response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for SteamError {
    fn from(err: reqwest::Error) -> Self {
        // The owned-games URL carries the API key
        Self::Transport(err.without_url())
    }
}

/// One entry of an account's owned-games snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedGameSnapshot {
    pub app_id: i32,
    pub name: String,
    pub icon_hash: Option<String>,
    pub playtime_forever: i32,
    pub playtime_recent: i32,
    pub playtime_windows: i32,
    pub playtime_mac: i32,
    pub playtime_linux: i32,
    /// Unix seconds; Steam reports 0 for never played.
    pub last_played: Option<i64>,
}

impl OwnedGameSnapshot {
    #[must_use]
    pub fn icon_url(&self) -> Option<String> {
        self.icon_hash
            .as_deref()
            .filter(|hash| !hash.is_empty())
            .map(|hash| format!("{ICON_BASE}/{}/{hash}.jpg", self.app_id))
    }

    #[must_use]
    pub fn header_image_url(&self) -> String {
        format!("{HEADER_BASE}/{}/header.jpg", self.app_id)
    }

    #[must_use]
    pub fn last_played_at(&self) -> Option<String> {
        self.last_played
            .filter(|secs| *secs > 0)
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceOverview {
    pub currency: String,
    pub initial: i32,
    #[serde(rename = "final")]
    pub final_price: i32,
    pub discount_percent: i32,
}

#[async_trait]
pub trait SteamCatalog: Send + Sync {
    /// Full owned-games snapshot for a SteamID64. Private profiles come back
    /// as an empty list.
    async fn owned_games(
        &self,
        steam_id: &str,
        api_key: &str,
    ) -> Result<Vec<OwnedGameSnapshot>, SteamError>;

    /// Price lookup for a batch of app ids. Every requested id is present in
    /// the result; `None` means Steam had no usable price for it.
    async fn app_prices(
        &self,
        app_ids: &[i32],
    ) -> Result<HashMap<i32, Option<PriceOverview>>, SteamError>;
}

#[derive(Debug, Deserialize)]
struct OwnedGamesEnvelope {
    response: OwnedGamesBody,
}

#[derive(Debug, Deserialize)]
struct OwnedGamesBody {
    #[serde(default)]
    games: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SteamOwnedGame {
    appid: i32,
    name: String,
    #[serde(default)]
    img_icon_url: Option<String>,
    playtime_forever: i32,
    #[serde(default)]
    playtime_2weeks: Option<i32>,
    #[serde(default)]
    playtime_windows_forever: i32,
    #[serde(default)]
    playtime_mac_forever: i32,
    #[serde(default)]
    playtime_linux_forever: i32,
    #[serde(default)]
    rtime_last_played: Option<i64>,
}

impl From<SteamOwnedGame> for OwnedGameSnapshot {
    fn from(game: SteamOwnedGame) -> Self {
        Self {
            app_id: game.appid,
            name: game.name,
            icon_hash: game.img_icon_url,
            playtime_forever: game.playtime_forever,
            playtime_recent: game.playtime_2weeks.unwrap_or(0),
            playtime_windows: game.playtime_windows_forever,
            playtime_mac: game.playtime_mac_forever,
            playtime_linux: game.playtime_linux_forever,
            last_played: game.rtime_last_played,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppDetailsEntry {
    success: bool,
    // Free titles come back as `"data": []`
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsData {
    #[serde(default)]
    price_overview: Option<PriceOverview>,
}

pub fn parse_owned_games(body: serde_json::Value) -> Result<Vec<OwnedGameSnapshot>, SteamError> {
    let envelope: OwnedGamesEnvelope = serde_json::from_value(body)
        .map_err(|e| SteamError::InvalidResponse(format!("owned games: {e}")))?;

    let raw = envelope.response.games.unwrap_or_default();
    let mut games = Vec::with_capacity(raw.len());

    for item in raw {
        match serde_json::from_value::<SteamOwnedGame>(item) {
            Ok(game) => games.push(OwnedGameSnapshot::from(game)),
            Err(e) => warn!(error = %e, "Skipping malformed owned game entry"),
        }
    }

    Ok(games)
}

pub fn parse_app_prices(
    app_ids: &[i32],
    body: serde_json::Value,
) -> Result<HashMap<i32, Option<PriceOverview>>, SteamError> {
    let serde_json::Value::Object(mut entries) = body else {
        return Err(SteamError::InvalidResponse(
            "app details: expected a JSON object".to_string(),
        ));
    };

    let mut prices = HashMap::with_capacity(app_ids.len());

    for &app_id in app_ids {
        let price = entries
            .remove(&app_id.to_string())
            .and_then(|entry| parse_price_entry(app_id, entry));
        prices.insert(app_id, price);
    }

    Ok(prices)
}

fn parse_price_entry(app_id: i32, entry: serde_json::Value) -> Option<PriceOverview> {
    let entry: AppDetailsEntry = match serde_json::from_value(entry) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(app_id, error = %e, "Failed to parse app details response");
            return None;
        }
    };

    if !entry.success {
        return None;
    }

    let data = entry.data?;
    if data.is_array() {
        return None;
    }

    match serde_json::from_value::<AppDetailsData>(data) {
        Ok(data) => data.price_overview,
        Err(e) => {
            warn!(app_id, error = %e, "Failed to parse app details response");
            None
        }
    }
}

#[derive(Clone)]
pub struct SteamClient {
    client: Client,
    api_base_url: String,
    store_base_url: String,
}

impl SteamClient {
    #[must_use]
    pub fn with_shared_client(client: Client, config: &SteamConfig) -> Self {
        Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            store_base_url: config.store_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, url: url::Url) -> Result<serde_json::Value, SteamError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(SteamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SteamError::InvalidResponse(e.without_url().to_string()))
    }
}

#[async_trait]
impl SteamCatalog for SteamClient {
    async fn owned_games(
        &self,
        steam_id: &str,
        api_key: &str,
    ) -> Result<Vec<OwnedGameSnapshot>, SteamError> {
        let url = url::Url::parse_with_params(
            &format!("{}/IPlayerService/GetOwnedGames/v1/", self.api_base_url),
            &[
                ("key", api_key),
                ("steamid", steam_id),
                ("include_appinfo", "1"),
                ("include_played_free_games", "1"),
            ],
        )
        .map_err(|e| SteamError::InvalidResponse(format!("bad API base URL: {e}")))?;

        let body = self.get_json(url).await?;
        parse_owned_games(body)
    }

    async fn app_prices(
        &self,
        app_ids: &[i32],
    ) -> Result<HashMap<i32, Option<PriceOverview>>, SteamError> {
        if app_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = app_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let url = url::Url::parse_with_params(
            &format!("{}/api/appdetails/", self.store_base_url),
            &[("appids", ids.as_str()), ("filters", "price_overview")],
        )
        .map_err(|e| SteamError::InvalidResponse(format!("bad store base URL: {e}")))?;

        let body = self.get_json(url).await?;
        parse_app_prices(app_ids, body)
    }
}

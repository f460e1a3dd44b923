//! Price backfill for catalog games that have never been priced.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::clients::SteamCatalog;
use crate::db::Store;

/// Attempts a game gets before it drops out of the backfill selection.
pub const MAX_FETCH_ATTEMPTS: i32 = 3;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for PriceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PriceBackfillResult {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    /// Set when the whole Steam lookup failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct PriceService {
    store: Store,
    catalog: Arc<dyn SteamCatalog>,
}

impl PriceService {
    #[must_use]
    pub fn new(store: Store, catalog: Arc<dyn SteamCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Every selected game has its attempt counter bumped exactly once,
    /// whether Steam answered for it, answered without a price, or the
    /// whole request failed.
    pub async fn backfill_missing_prices(&self) -> Result<PriceBackfillResult, PriceError> {
        let app_ids = self
            .store
            .list_games_missing_prices(MAX_FETCH_ATTEMPTS)
            .await?;

        let mut result = PriceBackfillResult {
            total: app_ids.len(),
            ..PriceBackfillResult::default()
        };

        if app_ids.is_empty() {
            return Ok(result);
        }

        let prices = match self.catalog.app_prices(&app_ids).await {
            Ok(prices) => prices,
            Err(e) => {
                error!(
                    event = "price_backfill_fetch_failed",
                    games = app_ids.len(),
                    error = %e,
                    "Failed to fetch game prices"
                );
                self.store.increment_price_attempts(&app_ids).await?;
                metrics::counter!("price_backfill_items_total", "outcome" => "failure")
                    .increment(app_ids.len() as u64);

                result.failed = app_ids.len();
                result.error = Some(e.to_string());
                return Ok(result);
            }
        };

        let mut unpriced = Vec::new();

        for app_id in &app_ids {
            match prices.get(app_id).and_then(Option::as_ref) {
                Some(price) => {
                    self.store.record_game_price(*app_id, price).await?;
                    result.succeeded += 1;
                }
                None => unpriced.push(*app_id),
            }
        }

        self.store.increment_price_attempts(&unpriced).await?;
        result.failed = unpriced.len();

        metrics::counter!("price_backfill_items_total", "outcome" => "success")
            .increment(result.succeeded as u64);
        metrics::counter!("price_backfill_items_total", "outcome" => "failure")
            .increment(result.failed as u64);

        info!(
            event = "price_backfill_finished",
            total = result.total,
            succeeded = result.succeeded,
            failed = result.failed,
            "Price backfill finished"
        );

        Ok(result)
    }
}

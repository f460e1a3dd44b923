//! Reconciliation of Steam libraries into local storage.

use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, stream};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::clients::{SteamCatalog, SteamError};
use crate::db::{SteamAccount, Store};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    External(#[from] SteamError),

    #[error("Steam account {0} not found")]
    AccountNotFound(i32),

    #[error("Steam API key is not configured")]
    MissingApiKey,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub account_id: i32,
    pub steam_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncAllResult {
    pub succeeded: usize,
    pub failed: usize,
    pub total_games_synced: usize,
    pub errors: Vec<SyncFailure>,
}

#[derive(Clone)]
pub struct SyncService {
    store: Store,
    catalog: Arc<dyn SteamCatalog>,
    api_key: String,
    max_concurrent: usize,
}

impl SyncService {
    #[must_use]
    pub fn new(
        store: Store,
        catalog: Arc<dyn SteamCatalog>,
        api_key: String,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store,
            catalog,
            api_key,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetches the account's full owned-games snapshot and merges it in.
    /// Returns the number of games in the snapshot.
    pub async fn sync_account(
        &self,
        account_id: i32,
        steam_id: &str,
        api_key: &str,
    ) -> Result<usize, SyncError> {
        let start = Instant::now();

        let snapshot = self.catalog.owned_games(steam_id, api_key).await?;
        self.store
            .reconcile_owned_games(account_id, &snapshot)
            .await?;

        metrics::counter!("steam_sync_games_total").increment(snapshot.len() as u64);

        info!(
            event = "steam_account_synced",
            account_id,
            games = snapshot.len(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Steam library reconciled"
        );

        Ok(snapshot.len())
    }

    /// Looks the account up and syncs it with the configured API key.
    pub async fn sync_account_by_id(&self, account_id: i32) -> Result<usize, SyncError> {
        let account = self
            .store
            .get_steam_account(account_id)
            .await?
            .ok_or(SyncError::AccountNotFound(account_id))?;

        let api_key = self.require_api_key()?;
        self.sync_account(account.id, &account.steam_id, api_key)
            .await
    }

    /// Syncs every stored account with bounded fan-out. One account failing
    /// never stops the others.
    pub async fn sync_all(&self) -> Result<SyncAllResult, SyncError> {
        let api_key = self.require_api_key()?;
        let accounts = self.store.list_all_steam_accounts().await?;

        let outcomes: Vec<(SteamAccount, Result<usize, SyncError>)> = stream::iter(accounts)
            .map(|account| async move {
                let outcome = self
                    .sync_account(account.id, &account.steam_id, api_key)
                    .await;
                (account, outcome)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut result = SyncAllResult::default();

        for (account, outcome) in outcomes {
            match outcome {
                Ok(count) => {
                    result.succeeded += 1;
                    result.total_games_synced += count;
                    metrics::counter!("steam_sync_accounts_total", "outcome" => "success")
                        .increment(1);
                }
                Err(e) => {
                    warn!(
                        event = "steam_account_sync_failed",
                        account_id = account.id,
                        error = %e,
                        "Steam library sync failed"
                    );
                    metrics::counter!("steam_sync_accounts_total", "outcome" => "failure")
                        .increment(1);
                    result.failed += 1;
                    result.errors.push(SyncFailure {
                        account_id: account.id,
                        steam_id: account.steam_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        result.errors.sort_by_key(|failure| failure.account_id);

        Ok(result)
    }

    fn require_api_key(&self) -> Result<&str, SyncError> {
        if self.api_key.trim().is_empty() {
            return Err(SyncError::MissingApiKey);
        }
        Ok(&self.api_key)
    }
}

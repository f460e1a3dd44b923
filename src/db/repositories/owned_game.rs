use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

use crate::clients::OwnedGameSnapshot;
use crate::db::repositories::game::{Game, insert_missing_games};
use crate::entities::{owned_games, prelude::*, steam_accounts};

const UPSERT_CHUNK: usize = 500;

#[derive(Debug, Clone, serde::Serialize)]
pub struct OwnedGame {
    pub steam_account_id: i32,
    pub app_id: i32,
    pub playtime_forever: i32,
    pub playtime_recent: i32,
    pub playtime_windows: i32,
    pub playtime_mac: i32,
    pub playtime_linux: i32,
    pub last_played_at: Option<String>,
    pub hidden: bool,
    pub synced_at: String,
}

impl From<owned_games::Model> for OwnedGame {
    fn from(model: owned_games::Model) -> Self {
        Self {
            steam_account_id: model.steam_account_id,
            app_id: model.app_id,
            playtime_forever: model.playtime_forever,
            playtime_recent: model.playtime_recent,
            playtime_windows: model.playtime_windows,
            playtime_mac: model.playtime_mac,
            playtime_linux: model.playtime_linux,
            last_played_at: model.last_played_at,
            hidden: model.hidden,
            synced_at: model.synced_at,
        }
    }
}

/// An ownership row joined with its catalog entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OwnedGameWithGame {
    #[serde(flatten)]
    pub owned: OwnedGame,
    pub game: Option<Game>,
}

/// A game owner as seen from the admin catalog view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GameOwner {
    pub steam_account_id: i32,
    pub steam_id: String,
    pub steam_username: String,
    pub user_id: i32,
    pub playtime_forever: i32,
    pub hidden: bool,
}

pub struct OwnedGameRepository {
    conn: DatabaseConnection,
}

impl OwnedGameRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Merges a snapshot into storage for one account.
    ///
    /// Catalog rows are created if missing, ownership rows are upserted with
    /// one conditional statement per chunk, and the account's
    /// `last_synced_at` is stamped. Rows absent from the snapshot are kept.
    pub async fn reconcile(&self, account_id: i32, snapshot: &[OwnedGameSnapshot]) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        insert_missing_games(&txn, snapshot).await?;
        upsert_ownership(&txn, account_id, snapshot, &now).await?;

        SteamAccounts::update_many()
            .col_expr(
                steam_accounts::Column::LastSyncedAt,
                Expr::value(Some(now)),
            )
            .filter(steam_accounts::Column::Id.eq(account_id))
            .exec(&txn)
            .await
            .context("Failed to stamp last_synced_at")?;

        txn.commit().await?;

        Ok(())
    }

    pub async fn list_for_account(&self, account_id: i32) -> Result<Vec<OwnedGame>> {
        let rows = OwnedGames::find()
            .filter(owned_games::Column::SteamAccountId.eq(account_id))
            .order_by_asc(owned_games::Column::AppId)
            .all(&self.conn)
            .await
            .context("Failed to list owned games")?;

        Ok(rows.into_iter().map(OwnedGame::from).collect())
    }

    pub async fn visible_with_games(&self, account_ids: &[i32]) -> Result<Vec<OwnedGameWithGame>> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = OwnedGames::find()
            .find_also_related(Games)
            .filter(owned_games::Column::SteamAccountId.is_in(account_ids.iter().copied()))
            .filter(owned_games::Column::Hidden.eq(false))
            .order_by_asc(owned_games::Column::AppId)
            .all(&self.conn)
            .await
            .context("Failed to load visible owned games")?;

        Ok(rows
            .into_iter()
            .map(|(owned, game)| OwnedGameWithGame {
                owned: OwnedGame::from(owned),
                game: game.map(Game::from),
            })
            .collect())
    }

    pub async fn set_hidden(&self, account_id: i32, app_id: i32, hidden: bool) -> Result<u64> {
        let result = OwnedGames::update_many()
            .col_expr(owned_games::Column::Hidden, Expr::value(hidden))
            .filter(owned_games::Column::SteamAccountId.eq(account_id))
            .filter(owned_games::Column::AppId.eq(app_id))
            .exec(&self.conn)
            .await
            .context("Failed to update game visibility")?;

        Ok(result.rows_affected)
    }

    pub async fn owners_of(&self, app_id: i32) -> Result<Vec<GameOwner>> {
        let rows = OwnedGames::find()
            .find_also_related(SteamAccounts)
            .filter(owned_games::Column::AppId.eq(app_id))
            .order_by_asc(owned_games::Column::SteamAccountId)
            .all(&self.conn)
            .await
            .context("Failed to load game owners")?;

        Ok(rows
            .into_iter()
            .filter_map(|(owned, account)| {
                account.map(|account| GameOwner {
                    steam_account_id: account.id,
                    steam_id: account.steam_id,
                    steam_username: account.steam_username,
                    user_id: account.user_id,
                    playtime_forever: owned.playtime_forever,
                    hidden: owned.hidden,
                })
            })
            .collect())
    }
}

/// Insert-or-overwrite of every mutable ownership field. `hidden` is only
/// written on insert so a user's choice survives later syncs.
async fn upsert_ownership<C: ConnectionTrait>(
    conn: &C,
    account_id: i32,
    snapshot: &[OwnedGameSnapshot],
    synced_at: &str,
) -> Result<()> {
    for chunk in snapshot.chunks(UPSERT_CHUNK) {
        let models = chunk.iter().map(|game| owned_games::ActiveModel {
            steam_account_id: Set(account_id),
            app_id: Set(game.app_id),
            playtime_forever: Set(game.playtime_forever),
            playtime_recent: Set(game.playtime_recent),
            playtime_windows: Set(game.playtime_windows),
            playtime_mac: Set(game.playtime_mac),
            playtime_linux: Set(game.playtime_linux),
            last_played_at: Set(game.last_played_at()),
            hidden: Set(false),
            synced_at: Set(synced_at.to_string()),
        });

        OwnedGames::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    owned_games::Column::SteamAccountId,
                    owned_games::Column::AppId,
                ])
                .update_columns([
                    owned_games::Column::PlaytimeForever,
                    owned_games::Column::PlaytimeRecent,
                    owned_games::Column::PlaytimeWindows,
                    owned_games::Column::PlaytimeMac,
                    owned_games::Column::PlaytimeLinux,
                    owned_games::Column::LastPlayedAt,
                    owned_games::Column::SyncedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .with_context(|| format!("Failed to upsert owned games for account {account_id}"))?;
    }

    Ok(())
}

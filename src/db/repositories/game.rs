use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
    sea_query::{Expr, OnConflict},
};

use crate::clients::{OwnedGameSnapshot, PriceOverview};
use crate::entities::{games, prelude::*};

/// Rows per multi-row INSERT, well under SQLite's bound-variable limit.
const INSERT_CHUNK: usize = 500;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Game {
    pub app_id: i32,
    pub name: String,
    pub icon_url: Option<String>,
    pub header_image_url: Option<String>,
    pub price: Option<GamePrice>,
    pub price_last_fetched_at: Option<String>,
    pub price_fetch_attempts: i32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GamePrice {
    pub currency: String,
    pub initial: i32,
    pub final_price: i32,
    pub discount_percent: i32,
}

impl From<games::Model> for Game {
    fn from(model: games::Model) -> Self {
        let price = match (model.price_currency, model.price_initial, model.price_final) {
            (Some(currency), Some(initial), Some(final_price)) => Some(GamePrice {
                currency,
                initial,
                final_price,
                discount_percent: model.price_discount_percent.unwrap_or(0),
            }),
            _ => None,
        };

        Self {
            app_id: model.app_id,
            name: model.name,
            icon_url: model.icon_url,
            header_image_url: model.header_image_url,
            price,
            price_last_fetched_at: model.price_last_fetched_at,
            price_fetch_attempts: model.price_fetch_attempts,
        }
    }
}

pub struct GameRepository {
    conn: DatabaseConnection,
}

impl GameRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, app_id: i32) -> Result<Option<Game>> {
        let row = Games::find_by_id(app_id)
            .one(&self.conn)
            .await
            .context("Failed to query game")?;

        Ok(row.map(Game::from))
    }

    pub async fn list(&self) -> Result<Vec<Game>> {
        let rows = Games::find()
            .order_by_asc(games::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list games")?;

        Ok(rows.into_iter().map(Game::from).collect())
    }

    /// App ids that have never been priced and still have retry budget left.
    pub async fn list_missing_prices(&self, max_attempts: i32) -> Result<Vec<i32>> {
        let ids: Vec<i32> = Games::find()
            .select_only()
            .column(games::Column::AppId)
            .filter(games::Column::PriceLastFetchedAt.is_null())
            .filter(games::Column::PriceFetchAttempts.lt(max_attempts))
            .order_by_asc(games::Column::AppId)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to select games missing prices")?;

        Ok(ids)
    }

    /// Writes a fetched price and counts the attempt.
    pub async fn record_price(&self, app_id: i32, price: &PriceOverview) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        Games::update_many()
            .col_expr(
                games::Column::PriceCurrency,
                Expr::value(Some(price.currency.clone())),
            )
            .col_expr(games::Column::PriceInitial, Expr::value(Some(price.initial)))
            .col_expr(games::Column::PriceFinal, Expr::value(Some(price.final_price)))
            .col_expr(
                games::Column::PriceDiscountPercent,
                Expr::value(Some(price.discount_percent)),
            )
            .col_expr(games::Column::PriceLastFetchedAt, Expr::value(Some(now)))
            .col_expr(
                games::Column::PriceFetchAttempts,
                Expr::col(games::Column::PriceFetchAttempts).add(1),
            )
            .filter(games::Column::AppId.eq(app_id))
            .exec(&self.conn)
            .await
            .with_context(|| format!("Failed to record price for app {app_id}"))?;

        Ok(())
    }

    /// Counts a failed attempt without touching any price column.
    pub async fn increment_price_attempts(&self, app_ids: &[i32]) -> Result<u64> {
        if app_ids.is_empty() {
            return Ok(0);
        }

        let result = Games::update_many()
            .col_expr(
                games::Column::PriceFetchAttempts,
                Expr::col(games::Column::PriceFetchAttempts).add(1),
            )
            .filter(games::Column::AppId.is_in(app_ids.iter().copied()))
            .exec(&self.conn)
            .await
            .context("Failed to increment price fetch attempts")?;

        Ok(result.rows_affected)
    }
}

/// Creates catalog rows for snapshot entries not seen before. Existing rows
/// are left alone: the first snapshot to mention a game owns its metadata.
pub async fn insert_missing_games<C: ConnectionTrait>(
    conn: &C,
    snapshot: &[OwnedGameSnapshot],
) -> Result<u64> {
    let now = chrono::Utc::now().to_rfc3339();
    let mut inserted = 0;

    for chunk in snapshot.chunks(INSERT_CHUNK) {
        let models = chunk.iter().map(|game| games::ActiveModel {
            app_id: sea_orm::Set(game.app_id),
            name: sea_orm::Set(game.name.clone()),
            icon_url: sea_orm::Set(game.icon_url()),
            header_image_url: sea_orm::Set(Some(game.header_image_url())),
            price_currency: sea_orm::Set(None),
            price_initial: sea_orm::Set(None),
            price_final: sea_orm::Set(None),
            price_discount_percent: sea_orm::Set(None),
            price_last_fetched_at: sea_orm::Set(None),
            price_fetch_attempts: sea_orm::Set(0),
            cached_at: sea_orm::Set(now.clone()),
        });

        inserted += Games::insert_many(models)
            .on_conflict(
                OnConflict::column(games::Column::AppId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .context("Failed to insert catalog games")?;
    }

    Ok(inserted)
}

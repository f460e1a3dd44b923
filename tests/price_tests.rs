//! Integration tests for the price backfill.

mod common;

use std::sync::Arc;

use common::{FakeCatalog, price, snapshot};
use steamboat::clients::SteamCatalog;
use steamboat::db::Store;
use steamboat::services::{MAX_FETCH_ATTEMPTS, PriceService, SyncService};

/// Seeds the catalog through a real sync so the rows look like production ones.
async fn seed_games(store: &Store, catalog: &Arc<FakeCatalog>, app_ids: &[i32]) {
    let user = common::seed_user(store, "200").await;
    let account = common::seed_account(store, user.id, "76561197960288000").await;

    catalog.set_library(
        &account.steam_id,
        app_ids
            .iter()
            .map(|id| snapshot(*id, &format!("Game {id}"), 0))
            .collect(),
    );

    SyncService::new(
        store.clone(),
        catalog.clone() as Arc<dyn SteamCatalog>,
        "test-api-key".to_string(),
        1,
    )
    .sync_account_by_id(account.id)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_backfill_records_prices_and_counts_unpriced() {
    let db = common::test_store("prices-mixed").await;
    let store = db.store.clone();
    let catalog = Arc::new(FakeCatalog::default());
    seed_games(&store, &catalog, &[10, 20, 30]).await;

    catalog.set_price(10, price("USD", 1999, 999));
    catalog.set_price(30, price("EUR", 500, 500));

    let prices = PriceService::new(store.clone(), catalog.clone());
    let result = prices.backfill_missing_prices().await.unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);
    assert!(result.error.is_none());
    assert_eq!(catalog.requested_price_ids(), vec![vec![10, 20, 30]]);

    let priced = store.get_game(10).await.unwrap().unwrap();
    let game_price = priced.price.unwrap();
    assert_eq!(game_price.currency, "USD");
    assert_eq!(game_price.initial, 1999);
    assert_eq!(game_price.final_price, 999);
    assert!(priced.price_last_fetched_at.is_some());
    assert_eq!(priced.price_fetch_attempts, 1);

    let unpriced = store.get_game(20).await.unwrap().unwrap();
    assert!(unpriced.price.is_none());
    assert!(unpriced.price_last_fetched_at.is_none());
    assert_eq!(unpriced.price_fetch_attempts, 1);

    // Priced games drop out of the next selection
    assert_eq!(
        store
            .list_games_missing_prices(MAX_FETCH_ATTEMPTS)
            .await
            .unwrap(),
        vec![20]
    );
}

#[tokio::test]
async fn test_unpriced_game_is_retried_a_bounded_number_of_times() {
    let db = common::test_store("prices-bound").await;
    let store = db.store.clone();
    let catalog = Arc::new(FakeCatalog::default());
    seed_games(&store, &catalog, &[42]).await;

    let prices = PriceService::new(store.clone(), catalog.clone());

    for _ in 0..MAX_FETCH_ATTEMPTS {
        let result = prices.backfill_missing_prices().await.unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.failed, 1);
    }

    let result = prices.backfill_missing_prices().await.unwrap();
    assert_eq!(result.total, 0);
    assert_eq!(catalog.price_calls(), MAX_FETCH_ATTEMPTS as usize);

    let game = store.get_game(42).await.unwrap().unwrap();
    assert_eq!(game.price_fetch_attempts, MAX_FETCH_ATTEMPTS);
}

#[tokio::test]
async fn test_failed_lookup_charges_every_selected_game() {
    let db = common::test_store("prices-failure").await;
    let store = db.store.clone();
    let catalog = Arc::new(FakeCatalog::default());
    seed_games(&store, &catalog, &[1, 2]).await;

    catalog.set_price(1, price("USD", 100, 100));
    catalog.fail_prices(true);

    let prices = PriceService::new(store.clone(), catalog.clone());
    let result = prices.backfill_missing_prices().await.unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.succeeded, 0);
    assert_eq!(result.failed, 2);
    assert!(result.error.is_some());

    for app_id in [1, 2] {
        let game = store.get_game(app_id).await.unwrap().unwrap();
        assert!(game.price.is_none());
        assert_eq!(game.price_fetch_attempts, 1);
    }

    catalog.fail_prices(false);
    let result = prices.backfill_missing_prices().await.unwrap();
    assert_eq!(result.succeeded, 1);
}

#[tokio::test]
async fn test_empty_selection_makes_no_request() {
    let db = common::test_store("prices-empty").await;
    let store = db.store.clone();
    let catalog = Arc::new(FakeCatalog::default());

    let prices = PriceService::new(store, catalog.clone());
    let result = prices.backfill_missing_prices().await.unwrap();

    assert_eq!(result.total, 0);
    assert_eq!(catalog.price_calls(), 0);
}

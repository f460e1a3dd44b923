//! Integration tests for account linking, visibility and comparisons.

mod common;

use std::sync::Arc;

use common::{FakeCatalog, price, snapshot};
use steamboat::clients::SteamCatalog;
use steamboat::db::{Game, Store};
use steamboat::services::{
    DiscordCompareOutcome, LibraryError, LibraryService, LinkOutcome, PriceService,
    SeaOrmLibraryService, SyncService, UnlinkOutcome, VisibilityOutcome,
};

struct Fixture {
    store: Store,
    catalog: Arc<FakeCatalog>,
    library: SeaOrmLibraryService,
    sync: SyncService,
    _db: common::TestDb,
}

async fn fixture(name: &str) -> Fixture {
    let db = common::test_store(name).await;
    let store = db.store.clone();
    let catalog = Arc::new(FakeCatalog::default());
    let sync = SyncService::new(
        store.clone(),
        catalog.clone() as Arc<dyn SteamCatalog>,
        "test-api-key".to_string(),
        2,
    );

    Fixture {
        library: SeaOrmLibraryService::new(store.clone()),
        store,
        catalog,
        sync,
        _db: db,
    }
}

fn ids(games: &[Game]) -> Vec<i32> {
    games.iter().map(|g| g.app_id).collect()
}

async fn linked_account(f: &Fixture, user_id: i32, steam_id: &str) -> i32 {
    match f
        .library
        .link_steam_account(user_id, &common::profile(steam_id))
        .await
        .unwrap()
    {
        LinkOutcome::Linked { account, is_new } => {
            assert!(is_new);
            account.id
        }
        LinkOutcome::AlreadyLinkedToAnotherUser => panic!("account unexpectedly taken"),
    }
}

#[tokio::test]
async fn test_link_relink_and_conflict() {
    let f = fixture("library-link").await;
    let alice = common::seed_user(&f.store, "300").await;
    let bob = common::seed_user(&f.store, "301").await;

    let account_id = linked_account(&f, alice.id, "76561197960290000").await;

    let mut refreshed = common::profile("76561197960290000");
    refreshed.steam_username = "new name".to_string();
    match f
        .library
        .link_steam_account(alice.id, &refreshed)
        .await
        .unwrap()
    {
        LinkOutcome::Linked { account, is_new } => {
            assert!(!is_new);
            assert_eq!(account.id, account_id);
            assert_eq!(account.steam_username, "new name");
        }
        LinkOutcome::AlreadyLinkedToAnotherUser => panic!("owner re-link must succeed"),
    }

    let outcome = f
        .library
        .link_steam_account(bob.id, &common::profile("76561197960290000"))
        .await
        .unwrap();
    assert!(matches!(outcome, LinkOutcome::AlreadyLinkedToAnotherUser));
}

#[tokio::test]
async fn test_link_rejects_malformed_steam_id() {
    let f = fixture("library-bad-id").await;
    let alice = common::seed_user(&f.store, "302").await;

    let err = f
        .library
        .link_steam_account(alice.id, &common::profile("12345"))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Validation(_)));
}

#[tokio::test]
async fn test_unlink_checks_ownership_and_removes_games() {
    let f = fixture("library-unlink").await;
    let alice = common::seed_user(&f.store, "303").await;
    let bob = common::seed_user(&f.store, "304").await;
    let account_id = linked_account(&f, alice.id, "76561197960290001").await;

    f.catalog
        .set_library("76561197960290001", vec![snapshot(10, "Alpha", 1)]);
    f.sync.sync_account_by_id(account_id).await.unwrap();

    assert_eq!(
        f.library
            .unlink_steam_account(bob.id, account_id)
            .await
            .unwrap(),
        UnlinkOutcome::NotFoundOrUnauthorized
    );
    assert_eq!(
        f.library.unlink_steam_account(alice.id, 999).await.unwrap(),
        UnlinkOutcome::NotFoundOrUnauthorized
    );
    assert_eq!(
        f.library
            .unlink_steam_account(alice.id, account_id)
            .await
            .unwrap(),
        UnlinkOutcome::Unlinked
    );

    assert!(f.store.get_steam_account(account_id).await.unwrap().is_none());
    assert!(f.store.list_owned_games(account_id).await.unwrap().is_empty());
    // The catalog entry is shared and stays
    assert!(f.store.get_game(10).await.unwrap().is_some());
}

#[tokio::test]
async fn test_visibility_hides_game_from_library_and_comparisons() {
    let f = fixture("library-visibility").await;
    let alice = common::seed_user(&f.store, "305").await;
    let bob = common::seed_user(&f.store, "306").await;
    let alice_acc = linked_account(&f, alice.id, "76561197960290002").await;
    let bob_acc = linked_account(&f, bob.id, "76561197960290003").await;

    f.catalog.set_library(
        "76561197960290002",
        vec![snapshot(1, "One", 1), snapshot(2, "Two", 1), snapshot(3, "Three", 1)],
    );
    f.catalog.set_library(
        "76561197960290003",
        vec![snapshot(2, "Two", 1), snapshot(3, "Three", 1), snapshot(4, "Four", 1)],
    );
    f.sync.sync_all().await.unwrap();

    let comparison = f.library.compare_users(alice.id, bob.id).await.unwrap();
    assert_eq!(ids(&comparison.shared), vec![2, 3]);
    assert_eq!(ids(&comparison.only_current_user), vec![1]);
    assert_eq!(ids(&comparison.only_target_user), vec![4]);

    assert_eq!(
        f.library
            .set_game_visibility(bob.id, alice_acc, 3, true)
            .await
            .unwrap(),
        VisibilityOutcome::NotFoundOrUnauthorized
    );
    assert_eq!(
        f.library
            .set_game_visibility(alice.id, alice_acc, 3, true)
            .await
            .unwrap(),
        VisibilityOutcome::Updated
    );

    let visible = f.library.visible_games(alice.id).await.unwrap();
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().all(|row| row.owned.app_id != 3));

    let comparison = f.library.compare_users(alice.id, bob.id).await.unwrap();
    assert_eq!(ids(&comparison.shared), vec![2]);
    assert_eq!(ids(&comparison.only_target_user), vec![3, 4]);

    // Nothing to hide on an account without the game
    assert_eq!(
        f.library
            .set_game_visibility(bob.id, bob_acc, 1, true)
            .await
            .unwrap(),
        VisibilityOutcome::NotFoundOrUnauthorized
    );
}

#[tokio::test]
async fn test_compare_with_user_without_accounts_is_empty() {
    let f = fixture("library-compare-empty").await;
    let alice = common::seed_user(&f.store, "307").await;
    let bob = common::seed_user(&f.store, "308").await;
    linked_account(&f, alice.id, "76561197960290004").await;

    f.catalog
        .set_library("76561197960290004", vec![snapshot(1, "One", 1)]);
    f.sync.sync_all().await.unwrap();

    let comparison = f.library.compare_users(alice.id, bob.id).await.unwrap();
    assert!(comparison.shared.is_empty());
    assert!(comparison.only_current_user.is_empty());
    assert!(comparison.only_target_user.is_empty());
}

#[tokio::test]
async fn test_compare_by_discord_id_outcomes() {
    let f = fixture("library-compare-discord").await;
    let alice = common::seed_user(&f.store, "309").await;
    let bob = common::seed_user(&f.store, "310").await;
    linked_account(&f, alice.id, "76561197960290005").await;
    linked_account(&f, bob.id, "76561197960290006").await;

    f.catalog.set_library(
        "76561197960290005",
        vec![snapshot(1, "One", 1), snapshot(2, "Two", 1)],
    );
    f.catalog.set_library(
        "76561197960290006",
        vec![snapshot(2, "Two", 1), snapshot(3, "Three", 1), snapshot(4, "Four", 1)],
    );
    f.sync.sync_all().await.unwrap();

    assert!(matches!(
        f.library
            .compare_by_discord_id(alice.id, "unknown")
            .await
            .unwrap(),
        DiscordCompareOutcome::NotFound
    ));
    assert!(matches!(
        f.library.compare_by_discord_id(alice.id, "309").await.unwrap(),
        DiscordCompareOutcome::IsSelf
    ));

    match f.library.compare_by_discord_id(alice.id, "310").await.unwrap() {
        DiscordCompareOutcome::Found {
            shared_games,
            shared_count,
            current_user_game_count,
            target_user_game_count,
        } => {
            assert_eq!(shared_count, 1);
            assert_eq!(shared_games[0].app_id, 2);
            assert_eq!(current_user_game_count, 2);
            assert_eq!(target_user_game_count, 3);
        }
        other => panic!("expected a comparison, got {other:?}"),
    }

    let outcome = f
        .library
        .compare_discord_users("310", "309")
        .await
        .unwrap();
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "found");
    assert_eq!(json["shared_count"], 1);
    assert_eq!(json["current_user_game_count"], 3);
}

#[tokio::test]
async fn test_library_value_sums_per_currency() {
    let f = fixture("library-value").await;
    let alice = common::seed_user(&f.store, "311").await;
    let first = linked_account(&f, alice.id, "76561197960290007").await;
    linked_account(&f, alice.id, "76561197960290008").await;

    f.catalog.set_library(
        "76561197960290007",
        vec![snapshot(1, "One", 1), snapshot(2, "Two", 1), snapshot(3, "Three", 1)],
    );
    // Same game on a second account only counts once
    f.catalog.set_library(
        "76561197960290008",
        vec![snapshot(1, "One", 1), snapshot(4, "Four", 1)],
    );
    f.sync.sync_all().await.unwrap();

    f.catalog.set_price(1, price("USD", 1000, 500));
    f.catalog.set_price(2, price("USD", 2000, 2000));
    f.catalog.set_price(3, price("EUR", 300, 300));
    PriceService::new(f.store.clone(), f.catalog.clone())
        .backfill_missing_prices()
        .await
        .unwrap();

    f.library
        .set_game_visibility(alice.id, first, 3, true)
        .await
        .unwrap();

    let value = f.library.library_value(alice.id).await.unwrap();

    assert_eq!(value.totals.len(), 1);
    assert_eq!(value.totals[0].currency, "USD");
    assert_eq!(value.totals[0].total_initial, 3000);
    assert_eq!(value.totals[0].total_final, 2500);
    assert_eq!(value.totals[0].game_count, 2);
    assert_eq!(value.unpriced_games, 1);
}

#[tokio::test]
async fn test_user_visible_games_for_any_user() {
    let f = fixture("library-user-games").await;
    let alice = common::seed_user(&f.store, "312").await;
    let bob = common::seed_user(&f.store, "313").await;
    let account = linked_account(&f, alice.id, "76561197960290009").await;

    f.catalog.set_library(
        "76561197960290009",
        vec![snapshot(5, "Five", 1), snapshot(6, "Six", 1)],
    );
    f.sync.sync_all().await.unwrap();
    f.library
        .set_game_visibility(alice.id, account, 6, true)
        .await
        .unwrap();

    let games = f.library.user_visible_games(alice.id).await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].owned.app_id, 5);
    assert_eq!(games[0].game.as_ref().unwrap().name, "Five");

    assert!(f.library.user_visible_games(bob.id).await.unwrap().is_empty());
    assert!(f.library.user_visible_games(9999).await.unwrap().is_empty());
}

//! Integration tests for administrator key verification.

mod common;

use std::sync::Arc;

use steamboat::services::{
    AdminKeyError, AdminKeyService, BootstrapManager, KeyVerification, SeaOrmAdminKeyService,
};

struct Bootstrapped {
    keys: Arc<dyn AdminKeyService>,
    store: steamboat::db::Store,
    secret: String,
    _db: common::TestDb,
}

async fn bootstrapped(name: &str) -> Bootstrapped {
    let db = common::test_store(name).await;
    let (store, config) = (db.store.clone(), db.config.clone());

    let secret = BootstrapManager::new(store.clone(), config.security.clone())
        .run()
        .await
        .unwrap()
        .issued
        .unwrap()
        .into_plaintext();

    let keys: Arc<dyn AdminKeyService> =
        Arc::new(SeaOrmAdminKeyService::new(store.clone(), config.security));

    Bootstrapped {
        keys,
        store,
        secret,
        _db: db,
    }
}

#[tokio::test]
async fn test_one_time_key_verifies_exactly_once() {
    let Bootstrapped { keys, store, secret, _db, .. } = bootstrapped("keys-single-use").await;

    match keys.verify(&secret).await.unwrap() {
        KeyVerification::Valid(key) => assert!(key.one_time_use),
        KeyVerification::Invalid => panic!("first redemption must succeed"),
    }

    assert!(!keys.verify(&secret).await.unwrap().is_valid());

    let listed = store.list_admin_keys().await.unwrap();
    assert!(listed[0].used);
    assert!(listed[0].last_used_at.is_some());
}

#[tokio::test]
async fn test_concurrent_redemption_has_single_winner() {
    let Bootstrapped { keys, secret, _db, .. } = bootstrapped("keys-race").await;

    let a = {
        let keys = keys.clone();
        let secret = secret.clone();
        tokio::spawn(async move { keys.verify(&secret).await.unwrap().is_valid() })
    };
    let b = {
        let keys = keys.clone();
        let secret = secret.clone();
        tokio::spawn(async move { keys.verify(&secret).await.unwrap().is_valid() })
    };

    let (a, b) = tokio::join!(a, b);
    let wins = [a.unwrap(), b.unwrap()].iter().filter(|won| **won).count();

    assert_eq!(wins, 1);
}

#[tokio::test]
async fn test_mark_used_reports_lost_race() {
    let Bootstrapped { keys, store, _db, .. } = bootstrapped("keys-mark-used").await;
    let key_id = store.list_admin_keys().await.unwrap()[0].id;

    assert!(keys.mark_used(key_id, true).await.unwrap());
    assert!(!keys.mark_used(key_id, true).await.unwrap());
}

#[tokio::test]
async fn test_permanent_key_is_reusable() {
    let Bootstrapped { keys, store, _db, .. } = bootstrapped("keys-permanent").await;
    let provisioned = keys.provision("ops").await.unwrap();
    let secret = provisioned.secret.into_plaintext();

    assert!(keys.verify(&secret).await.unwrap().is_valid());
    assert!(keys.verify(&secret).await.unwrap().is_valid());

    let listed = store.list_admin_keys().await.unwrap();
    let permanent = listed.iter().find(|k| !k.one_time_use).unwrap();
    assert!(!permanent.used);
    assert!(permanent.last_used_at.is_some());
}

#[tokio::test]
async fn test_wrong_secret_changes_nothing() {
    let Bootstrapped { keys, store, secret, _db, .. } = bootstrapped("keys-wrong").await;

    assert!(!keys.verify("not-the-secret").await.unwrap().is_valid());
    assert!(!keys.verify("").await.unwrap().is_valid());

    let listed = store.list_admin_keys().await.unwrap();
    assert!(!listed[0].used);
    assert!(listed[0].last_used_at.is_none());

    assert!(keys.verify(&secret).await.unwrap().is_valid());
}

#[tokio::test]
async fn test_provision_rejects_blank_name() {
    let Bootstrapped { keys, store, _db, .. } = bootstrapped("keys-blank-name").await;

    assert!(keys.provision("   ").await.is_err());
    assert_eq!(store.count_permanent_admin_keys().await.unwrap(), 0);
}

#[tokio::test]
async fn test_identify_leaves_one_time_key_unused() {
    let Bootstrapped { keys, store, secret, _db, .. } = bootstrapped("keys-identify").await;

    let first = keys.identify(&secret).await.unwrap().unwrap();
    let again = keys.identify(&secret).await.unwrap().unwrap();
    assert!(first.one_time_use);
    assert_eq!(first.id, again.id);
    assert!(keys.identify("not-the-secret").await.unwrap().is_none());

    let listed = store.list_admin_keys().await.unwrap();
    assert!(!listed[0].used);
    assert!(listed[0].last_used_at.is_none());
}

#[tokio::test]
async fn test_redeem_with_blank_name_keeps_one_time_key() {
    let Bootstrapped { keys, store, secret, _db, .. } = bootstrapped("keys-redeem-blank").await;
    let one_time = keys.identify(&secret).await.unwrap().unwrap();

    let err = keys.redeem(one_time.id, "  ").await.unwrap_err();
    assert!(matches!(err, AdminKeyError::Validation(_)));
    assert!(!store.list_admin_keys().await.unwrap()[0].used);

    let provisioned = keys.redeem(one_time.id, "primary").await.unwrap();
    assert_eq!(provisioned.key.name, "primary");

    let listed = store.list_admin_keys().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].used);
    assert_eq!(store.count_permanent_admin_keys().await.unwrap(), 1);
}

#[tokio::test]
async fn test_redeem_is_single_use_and_atomic() {
    let Bootstrapped { keys, store, secret, _db, .. } = bootstrapped("keys-redeem-race").await;
    let one_time_id = keys.identify(&secret).await.unwrap().unwrap().id;

    let attempt = |name: &'static str| {
        let keys = keys.clone();
        tokio::spawn(async move { keys.redeem(one_time_id, name).await })
    };
    let (a, b) = tokio::join!(attempt("first"), attempt("second"));
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);

    // The loser's permanent key was rolled back with its consume attempt
    assert_eq!(store.count_permanent_admin_keys().await.unwrap(), 1);
    assert!(matches!(
        keys.redeem(one_time_id, "third").await.unwrap_err(),
        AdminKeyError::AlreadyUsed
    ));
}

#[tokio::test]
async fn test_permanent_key_cannot_be_redeemed() {
    let Bootstrapped { keys, store, _db, .. } = bootstrapped("keys-redeem-permanent").await;
    let permanent = keys.provision("ops").await.unwrap();

    assert!(matches!(
        keys.redeem(permanent.key.id, "another").await.unwrap_err(),
        AdminKeyError::AlreadyUsed
    ));
    assert_eq!(store.count_permanent_admin_keys().await.unwrap(), 1);
}

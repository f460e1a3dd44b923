//! `SeaORM` implementation of the `AdminKeyService` trait.

use async_trait::async_trait;
use tokio::task;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::{AdminKey, CandidateKey, Store};
use crate::db::repositories::admin_key::{generate_secret, hash_secret, verify_secret};
use crate::services::admin_key_service::{
    AdminKeyError, AdminKeyService, IssuedSecret, KeyVerification, ProvisionedKey, VerifiedKey,
};

pub struct SeaOrmAdminKeyService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAdminKeyService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

/// Runs every hash comparison on the blocking pool and returns the first
/// matching candidate.
async fn find_match(
    presented: &str,
    candidates: Vec<CandidateKey>,
) -> Result<Option<CandidateKey>, AdminKeyError> {
    let presented = presented.to_string();

    task::spawn_blocking(move || {
        candidates.into_iter().find(|candidate| {
            verify_secret(&presented, &candidate.secret_hash).unwrap_or_else(|e| {
                warn!(key_id = candidate.id, error = %e, "Stored administrator key hash is unreadable");
                false
            })
        })
    })
    .await
    .map_err(|e| AdminKeyError::Internal(format!("Key verification task panicked: {e}")))
}

impl SeaOrmAdminKeyService {
    async fn create_permanent(
        &self,
        name: &str,
        redeeming: Option<i32>,
    ) -> Result<ProvisionedKey, AdminKeyError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AdminKeyError::Validation(
                "Key name cannot be empty".to_string(),
            ));
        }

        let secret = generate_secret();
        let to_hash = secret.clone();
        let security = self.security.clone();
        let secret_hash = task::spawn_blocking(move || hash_secret(&to_hash, Some(&security)))
            .await
            .map_err(|e| AdminKeyError::Internal(format!("Key hashing task panicked: {e}")))??;

        let Some(key) = self
            .store
            .provision_permanent_admin_key(name, secret_hash, redeeming)
            .await?
        else {
            warn!(
                event = "admin_key_race_lost",
                key_id = redeeming,
                "One-time administrator key was consumed by a concurrent request"
            );
            return Err(AdminKeyError::AlreadyUsed);
        };

        if let Some(one_time_id) = redeeming {
            info!(
                event = "admin_key_consumed",
                key_id = one_time_id,
                "One-time administrator key redeemed"
            );
        }

        info!(
            event = "admin_key_provisioned",
            key_id = key.id,
            key_name = %key.name,
            "Permanent administrator key provisioned"
        );

        Ok(ProvisionedKey {
            key,
            secret: IssuedSecret::new(secret),
        })
    }
}

#[async_trait]
impl AdminKeyService for SeaOrmAdminKeyService {
    async fn identify(&self, presented: &str) -> Result<Option<VerifiedKey>, AdminKeyError> {
        if presented.is_empty() {
            metrics::counter!("admin_key_verifications_total", "outcome" => "invalid").increment(1);
            return Ok(None);
        }

        let candidates = self.store.list_candidate_admin_keys().await?;

        let Some(matched) = find_match(presented, candidates).await? else {
            metrics::counter!("admin_key_verifications_total", "outcome" => "invalid").increment(1);
            return Ok(None);
        };

        metrics::counter!("admin_key_verifications_total", "outcome" => "matched").increment(1);

        Ok(Some(VerifiedKey {
            id: matched.id,
            name: matched.name,
            one_time_use: matched.one_time_use,
        }))
    }

    async fn verify(&self, presented: &str) -> Result<KeyVerification, AdminKeyError> {
        let Some(key) = self.identify(presented).await? else {
            return Ok(KeyVerification::Invalid);
        };

        if !self.mark_used(key.id, key.one_time_use).await? {
            warn!(
                event = "admin_key_race_lost",
                key_id = key.id,
                "Administrator key was consumed by a concurrent request"
            );
            return Ok(KeyVerification::Invalid);
        }

        if key.one_time_use {
            info!(
                event = "admin_key_consumed",
                key_id = key.id,
                "One-time administrator key redeemed"
            );
        }

        Ok(KeyVerification::Valid(key))
    }

    async fn mark_used(&self, key_id: i32, one_time_use: bool) -> Result<bool, AdminKeyError> {
        let marked = if one_time_use {
            self.store.consume_one_time_admin_key(key_id).await?
        } else {
            self.store.touch_admin_key(key_id).await?
        };

        Ok(marked)
    }

    async fn provision(&self, name: &str) -> Result<ProvisionedKey, AdminKeyError> {
        self.create_permanent(name, None).await
    }

    async fn redeem(
        &self,
        one_time_key_id: i32,
        name: &str,
    ) -> Result<ProvisionedKey, AdminKeyError> {
        self.create_permanent(name, Some(one_time_key_id)).await
    }

    async fn list(&self) -> Result<Vec<AdminKey>, AdminKeyError> {
        Ok(self.store.list_admin_keys().await?)
    }
}

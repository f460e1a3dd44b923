use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};

use crate::config::SecurityConfig;
use crate::db::repositories::system_flag::{FIRST_LAUNCH_FLAG, upsert_flag};
use crate::entities::{administrator_keys, prelude::*, system_flags};

/// Key metadata safe to hand out (no hash).
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminKey {
    pub id: i32,
    pub name: String,
    pub one_time_use: bool,
    pub used: bool,
    pub created_at: String,
    pub last_used_at: Option<String>,
}

impl From<administrator_keys::Model> for AdminKey {
    fn from(model: administrator_keys::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            one_time_use: model.one_time_use,
            used: model.used,
            created_at: model.created_at,
            last_used_at: model.last_used_at,
        }
    }
}

/// A key that can still verify, with the hash needed to check it.
#[derive(Debug, Clone)]
pub struct CandidateKey {
    pub id: i32,
    pub name: String,
    pub one_time_use: bool,
    pub secret_hash: String,
}

pub struct AdminKeyRepository {
    conn: DatabaseConnection,
}

impl AdminKeyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn count_permanent(&self) -> Result<u64> {
        AdministratorKeys::find()
            .filter(administrator_keys::Column::OneTimeUse.eq(false))
            .count(&self.conn)
            .await
            .context("Failed to count permanent administrator keys")
    }

    /// Keys with `used = false`. Permanent keys are always in this set.
    pub async fn list_candidates(&self) -> Result<Vec<CandidateKey>> {
        let keys = AdministratorKeys::find()
            .filter(administrator_keys::Column::Used.eq(false))
            .order_by_asc(administrator_keys::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load candidate administrator keys")?;

        Ok(keys
            .into_iter()
            .map(|k| CandidateKey {
                id: k.id,
                name: k.name,
                one_time_use: k.one_time_use,
                secret_hash: k.secret_hash,
            })
            .collect())
    }

    pub async fn list(&self) -> Result<Vec<AdminKey>> {
        let keys = AdministratorKeys::find()
            .order_by_asc(administrator_keys::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list administrator keys")?;

        Ok(keys.into_iter().map(AdminKey::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        AdministratorKeys::find()
            .count(&self.conn)
            .await
            .context("Failed to count administrator keys")
    }

    /// Marks a one-time key used. The `used = false` guard makes the check and
    /// the write a single statement, so only one caller can ever see `true`.
    pub async fn consume_one_time(&self, id: i32) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = AdministratorKeys::update_many()
            .col_expr(administrator_keys::Column::Used, Expr::value(true))
            .col_expr(administrator_keys::Column::LastUsedAt, Expr::value(Some(now)))
            .filter(administrator_keys::Column::Id.eq(id))
            .filter(administrator_keys::Column::OneTimeUse.eq(true))
            .filter(administrator_keys::Column::Used.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to consume one-time administrator key")?;

        Ok(result.rows_affected == 1)
    }

    pub async fn touch(&self, id: i32) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = AdministratorKeys::update_many()
            .col_expr(administrator_keys::Column::LastUsedAt, Expr::value(Some(now)))
            .filter(administrator_keys::Column::Id.eq(id))
            .filter(administrator_keys::Column::Used.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to update administrator key last use")?;

        Ok(result.rows_affected == 1)
    }

    /// First-launch issuance: the flag row and the one-time key are written in
    /// one transaction. The flag is inserted, not upserted, so a second
    /// concurrent bootstrap fails instead of issuing a second key.
    pub async fn issue_first_launch_key(&self, name: &str, secret_hash: String) -> Result<i32> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        let flag = system_flags::ActiveModel {
            key: Set(FIRST_LAUNCH_FLAG.to_string()),
            value: Set("true".to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
        };
        SystemFlags::insert(flag)
            .exec_without_returning(&txn)
            .await
            .context("Failed to set first-launch flag")?;

        let key = administrator_keys::ActiveModel {
            name: Set(name.to_string()),
            secret_hash: Set(secret_hash),
            one_time_use: Set(true),
            used: Set(false),
            created_at: Set(now),
            last_used_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert first-launch administrator key")?;

        txn.commit().await?;

        Ok(key.id)
    }

    /// Inserts a permanent key and marks setup complete in the same transaction.
    ///
    /// When `redeeming` names a one-time key, that key is consumed inside the
    /// transaction too. Returns `None`, with nothing written, if it was already
    /// used.
    pub async fn provision_permanent(
        &self,
        name: &str,
        secret_hash: String,
        redeeming: Option<i32>,
    ) -> Result<Option<AdminKey>> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        if let Some(one_time_id) = redeeming {
            let result = AdministratorKeys::update_many()
                .col_expr(administrator_keys::Column::Used, Expr::value(true))
                .col_expr(
                    administrator_keys::Column::LastUsedAt,
                    Expr::value(Some(now.clone())),
                )
                .filter(administrator_keys::Column::Id.eq(one_time_id))
                .filter(administrator_keys::Column::OneTimeUse.eq(true))
                .filter(administrator_keys::Column::Used.eq(false))
                .exec(&txn)
                .await
                .context("Failed to consume one-time administrator key")?;

            if result.rows_affected != 1 {
                txn.rollback().await?;
                return Ok(None);
            }
        }

        let key = administrator_keys::ActiveModel {
            name: Set(name.to_string()),
            secret_hash: Set(secret_hash),
            one_time_use: Set(false),
            used: Set(false),
            created_at: Set(now),
            last_used_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert permanent administrator key")?;

        upsert_flag(&txn, FIRST_LAUNCH_FLAG, "false").await?;

        txn.commit().await?;

        Ok(Some(AdminKey::from(key)))
    }
}

/// Hash a secret using Argon2id with optional custom params.
pub fn hash_secret(secret: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {e}"))?;

    Ok(hash.to_string())
}

/// Params are read back from the PHC string, so keys hashed under older
/// settings keep verifying.
pub fn verify_secret(secret: &str, secret_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(secret_hash)
        .map_err(|e| anyhow::anyhow!("Invalid secret hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Generate a random secret (64 character hex string)
#[must_use]
pub fn generate_secret() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_params() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 64,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        }
    }

    #[test]
    fn generated_secrets_are_hex_and_unique() {
        let a = generate_secret();
        let b = generate_secret();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_verifies_only_the_original_secret() {
        let hash = hash_secret("correct horse", Some(&cheap_params())).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_secret("correct horse", &hash).unwrap());
        assert!(!verify_secret("battery staple", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_secret("anything", "not-a-phc-string").is_err());
    }
}

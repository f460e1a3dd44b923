//! Domain service for administrator keys.
//!
//! Verifies presented secrets against stored Argon2 hashes, enforces
//! one-time-use semantics, and provisions permanent keys.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::db::AdminKey;

#[derive(Debug, Error)]
pub enum AdminKeyError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("One-time administrator key has already been used")]
    AlreadyUsed,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AdminKeyError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AdminKeyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// A freshly generated administrator secret.
///
/// It has no `Display`, `Clone` or `Serialize`, and `Debug` is redacted, so it
/// cannot end up in a log line by accident. The only way out is
/// [`IssuedSecret::into_plaintext`], which consumes it.
pub struct IssuedSecret(String);

impl IssuedSecret {
    pub(crate) const fn new(secret: String) -> Self {
        Self(secret)
    }

    #[must_use]
    pub fn into_plaintext(self) -> String {
        self.0
    }
}

impl fmt::Debug for IssuedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IssuedSecret([redacted])")
    }
}

/// The key that matched a presented secret.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedKey {
    pub id: i32,
    pub name: String,
    pub one_time_use: bool,
}

#[derive(Debug, Clone)]
pub enum KeyVerification {
    Valid(VerifiedKey),
    Invalid,
}

impl KeyVerification {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// A permanent key along with its plaintext, returned exactly once.
#[derive(Debug)]
pub struct ProvisionedKey {
    pub key: AdminKey,
    pub secret: IssuedSecret,
}

#[async_trait::async_trait]
pub trait AdminKeyService: Send + Sync {
    /// Finds the unused key matching a presented secret. Records nothing, so a
    /// one-time key stays redeemable.
    async fn identify(&self, presented: &str) -> Result<Option<VerifiedKey>, AdminKeyError>;

    /// Checks a presented secret against every eligible key and, on a match,
    /// records the use. A one-time key that loses a concurrent redemption
    /// race comes back as [`KeyVerification::Invalid`].
    async fn verify(&self, presented: &str) -> Result<KeyVerification, AdminKeyError>;

    /// Records a successful verification. Returns `false` when a one-time key
    /// had already been consumed.
    async fn mark_used(&self, key_id: i32, one_time_use: bool) -> Result<bool, AdminKeyError>;

    /// Creates a permanent key and completes first-time setup.
    async fn provision(&self, name: &str) -> Result<ProvisionedKey, AdminKeyError>;

    /// Trades a one-time key for a permanent one. The name is validated before
    /// anything is written, and the one-time key is consumed in the same
    /// transaction that creates the permanent key. Fails with
    /// [`AdminKeyError::AlreadyUsed`] if another request redeemed it first.
    async fn redeem(
        &self,
        one_time_key_id: i32,
        name: &str,
    ) -> Result<ProvisionedKey, AdminKeyError>;

    async fn list(&self) -> Result<Vec<AdminKey>, AdminKeyError>;
}

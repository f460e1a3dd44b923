//! First-launch bootstrap of the administrator credential.
//!
//! Runs once per process start, before any traffic is accepted. The persisted
//! `first_launch` flag and the count of permanent keys decide the setup state:
//!
//! | flag      | permanent keys | outcome                                  |
//! |-----------|----------------|------------------------------------------|
//! | absent    | 0              | issue a one-time key, flag = `"true"`    |
//! | `"true"`  | 0              | awaiting setup, not ready                |
//! | `"true"`  | > 0            | fatal                                    |
//! | `"false"` | any            | ready                                    |
//!
//! Anything else is fatal too.

use serde::Serialize;
use thiserror::Error;
use tokio::task;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::admin_key::{generate_secret, hash_secret};
use crate::db::repositories::system_flag::FIRST_LAUNCH_FLAG;
use crate::services::admin_key_service::IssuedSecret;

const FIRST_LAUNCH_KEY_NAME: &str = "First launch administrator key";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Administrator state is inconsistent: {0}")]
    InvariantViolation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for BootstrapError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupState {
    Uninitialized,
    AwaitingSetup,
    Ready,
}

#[derive(Debug)]
pub struct BootstrapReport {
    pub ready: bool,
    /// State found on disk before this run acted.
    pub state: SetupState,
    /// Only set on the run that performed first-launch issuance.
    pub issued: Option<IssuedSecret>,
}

pub struct BootstrapManager {
    store: Store,
    security: SecurityConfig,
}

impl BootstrapManager {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    pub async fn run(&self) -> Result<BootstrapReport, BootstrapError> {
        let flag = self.store.get_system_flag(FIRST_LAUNCH_FLAG).await?;
        let permanent_keys = self.store.count_permanent_admin_keys().await?;

        match flag.as_deref() {
            Some("true") if permanent_keys > 0 => Err(BootstrapError::InvariantViolation(format!(
                "first-launch flag is set but {permanent_keys} permanent administrator key(s) exist"
            ))),
            Some("true") => {
                warn!(
                    event = "bootstrap_awaiting_setup",
                    "Setup incomplete: redeem the one-time administrator key to provision a permanent key"
                );
                Ok(BootstrapReport {
                    ready: false,
                    state: SetupState::AwaitingSetup,
                    issued: None,
                })
            }
            Some("false") => {
                if permanent_keys == 0 {
                    warn!(
                        event = "bootstrap_no_admin_keys",
                        "Setup is complete but no permanent administrator key exists"
                    );
                }
                Ok(BootstrapReport {
                    ready: true,
                    state: SetupState::Ready,
                    issued: None,
                })
            }
            Some(other) => Err(BootstrapError::InvariantViolation(format!(
                "unexpected first-launch flag value {other:?}"
            ))),
            None => self.first_launch().await,
        }
    }

    async fn first_launch(&self) -> Result<BootstrapReport, BootstrapError> {
        let existing = self.store.count_admin_keys().await?;
        if existing > 0 {
            return Err(BootstrapError::InvariantViolation(format!(
                "first-launch flag is missing but {existing} administrator key(s) exist"
            )));
        }

        let secret = generate_secret();
        let to_hash = secret.clone();
        let security = self.security.clone();
        let secret_hash = task::spawn_blocking(move || hash_secret(&to_hash, Some(&security)))
            .await
            .map_err(|e| BootstrapError::Internal(format!("Key hashing task panicked: {e}")))??;

        let key_id = self
            .store
            .issue_first_launch_key(FIRST_LAUNCH_KEY_NAME, secret_hash)
            .await?;

        info!(
            event = "bootstrap_first_launch",
            key_id,
            "Issued one-time administrator key"
        );

        Ok(BootstrapReport {
            ready: true,
            state: SetupState::Uninitialized,
            issued: Some(IssuedSecret::new(secret)),
        })
    }
}

/// Shows the one-time secret on the operator console. This is the only place
/// the plaintext leaves the process, and it never goes through tracing.
pub fn announce_issued_secret(secret: IssuedSecret) {
    let plaintext = secret.into_plaintext();

    eprintln!();
    eprintln!("First launch: a one-time administrator key has been generated.");
    eprintln!("Use it to provision a permanent key (POST /api/admin/keys).");
    eprintln!("Save it securely, it will never be shown again.");
    eprintln!();
    eprintln!("    {plaintext}");
    eprintln!();
}

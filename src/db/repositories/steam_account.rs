use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{owned_games, prelude::*, steam_accounts};

#[derive(Debug, Clone, serde::Serialize)]
pub struct SteamAccount {
    pub id: i32,
    pub user_id: i32,
    pub steam_id: String,
    pub steam_username: String,
    pub steam_avatar: Option<String>,
    pub profile_url: Option<String>,
    pub last_synced_at: Option<String>,
    pub created_at: String,
}

impl From<steam_accounts::Model> for SteamAccount {
    fn from(model: steam_accounts::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            steam_id: model.steam_id,
            steam_username: model.steam_username,
            steam_avatar: model.steam_avatar,
            profile_url: model.profile_url,
            last_synced_at: model.last_synced_at,
            created_at: model.created_at,
        }
    }
}

/// Profile data reported by Steam when an account is linked.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SteamProfile {
    pub steam_id: String,
    pub steam_username: String,
    #[serde(default)]
    pub steam_avatar: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

pub struct SteamAccountRepository {
    conn: DatabaseConnection,
}

impl SteamAccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<SteamAccount>> {
        let row = SteamAccounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query steam account")?;

        Ok(row.map(SteamAccount::from))
    }

    pub async fn get_by_steam_id(&self, steam_id: &str) -> Result<Option<SteamAccount>> {
        let row = SteamAccounts::find()
            .filter(steam_accounts::Column::SteamId.eq(steam_id))
            .one(&self.conn)
            .await
            .context("Failed to query steam account by SteamID")?;

        Ok(row.map(SteamAccount::from))
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<SteamAccount>> {
        let rows = SteamAccounts::find()
            .filter(steam_accounts::Column::UserId.eq(user_id))
            .order_by_asc(steam_accounts::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list steam accounts for user")?;

        Ok(rows.into_iter().map(SteamAccount::from).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<SteamAccount>> {
        let rows = SteamAccounts::find()
            .order_by_asc(steam_accounts::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list steam accounts")?;

        Ok(rows.into_iter().map(SteamAccount::from).collect())
    }

    pub async fn insert(&self, user_id: i32, profile: &SteamProfile) -> Result<SteamAccount> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = steam_accounts::ActiveModel {
            user_id: Set(user_id),
            steam_id: Set(profile.steam_id.clone()),
            steam_username: Set(profile.steam_username.clone()),
            steam_avatar: Set(profile.steam_avatar.clone()),
            profile_url: Set(profile.profile_url.clone()),
            last_synced_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert steam account")?;

        Ok(SteamAccount::from(model))
    }

    pub async fn update_profile(&self, id: i32, profile: &SteamProfile) -> Result<()> {
        let account = SteamAccounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query steam account for profile update")?
            .ok_or_else(|| anyhow::anyhow!("Steam account not found: {id}"))?;

        let mut active: steam_accounts::ActiveModel = account.into();
        active.steam_username = Set(profile.steam_username.clone());
        active.steam_avatar = Set(profile.steam_avatar.clone());
        active.profile_url = Set(profile.profile_url.clone());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Removes the account together with its ownership rows.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        OwnedGames::delete_many()
            .filter(owned_games::Column::SteamAccountId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete owned games")?;

        let result = SteamAccounts::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete steam account")?;

        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }
}

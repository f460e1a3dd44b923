use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};

use crate::entities::{prelude::*, users};

#[derive(Debug, Clone, serde::Serialize)]
pub struct User {
    pub id: i32,
    pub discord_id: String,
    pub discord_username: String,
    pub discord_avatar: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            discord_id: model.discord_id,
            discord_username: model.discord_username,
            discord_avatar: model.discord_avatar,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_discord_id(&self, discord_id: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::DiscordId.eq(discord_id))
            .one(&self.conn)
            .await
            .context("Failed to query user by Discord ID")?;

        Ok(user.map(User::from))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = Users::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Registers a Discord identity, refreshing name and avatar when it
    /// already exists.
    pub async fn upsert_discord_user(
        &self,
        discord_id: &str,
        username: &str,
        avatar: Option<&str>,
    ) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = users::ActiveModel {
            discord_id: Set(discord_id.to_string()),
            discord_username: Set(username.to_string()),
            discord_avatar: Set(avatar.map(str::to_string)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Users::insert(model)
            .on_conflict(
                OnConflict::column(users::Column::DiscordId)
                    .update_columns([
                        users::Column::DiscordUsername,
                        users::Column::DiscordAvatar,
                        users::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to upsert Discord user")?;

        self.get_by_discord_id(discord_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {discord_id} missing after upsert"))
    }
}

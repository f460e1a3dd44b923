use anyhow::{Context, Result};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

use crate::entities::{prelude::*, system_flags};

/// Absent until the first bootstrap, then `"true"` until a permanent key is
/// provisioned, then `"false"`.
pub const FIRST_LAUNCH_FLAG: &str = "first_launch";

pub struct SystemFlagRepository {
    conn: DatabaseConnection,
}

impl SystemFlagRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = SystemFlags::find_by_id(key.to_string())
            .one(&self.conn)
            .await
            .with_context(|| format!("Failed to read system flag {key}"))?;

        Ok(row.map(|r| r.value))
    }
}

/// Usable inside a caller's transaction.
pub async fn upsert_flag<C: ConnectionTrait>(conn: &C, key: &str, value: &str) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();

    let model = system_flags::ActiveModel {
        key: Set(key.to_string()),
        value: Set(value.to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    };

    SystemFlags::insert(model)
        .on_conflict(
            OnConflict::column(system_flags::Column::Key)
                .update_columns([system_flags::Column::Value, system_flags::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .with_context(|| format!("Failed to write system flag {key}"))?;

    Ok(())
}

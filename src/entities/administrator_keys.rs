use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "administrator_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Argon2id hash of the secret. The plaintext is never stored.
    pub secret_hash: String,

    pub one_time_use: bool,

    /// Only ever flips to true for one-time keys.
    pub used: bool,

    pub created_at: String,

    pub last_used_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub discord_id: String,

    pub discord_username: String,

    pub discord_avatar: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::steam_accounts::Entity")]
    SteamAccounts,
}

impl Related<super::steam_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SteamAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "steam_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    /// SteamID64
    #[sea_orm(unique)]
    pub steam_id: String,

    pub steam_username: String,

    pub steam_avatar: Option<String>,

    pub profile_url: Option<String>,

    pub last_synced_at: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,

    #[sea_orm(has_many = "super::owned_games::Entity")]
    OwnedGames,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::owned_games::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OwnedGames.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "owned_games")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub steam_account_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub app_id: i32,

    /// Minutes
    pub playtime_forever: i32,
    pub playtime_recent: i32,
    pub playtime_windows: i32,
    pub playtime_mac: i32,
    pub playtime_linux: i32,

    pub last_played_at: Option<String>,

    /// Set by the owning user only; reconciliation never touches it.
    pub hidden: bool,

    pub synced_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::steam_accounts::Entity",
        from = "Column::SteamAccountId",
        to = "super::steam_accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SteamAccounts,

    #[sea_orm(
        belongs_to = "super::games::Entity",
        from = "Column::AppId",
        to = "super::games::Column::AppId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Games,
}

impl Related<super::steam_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SteamAccounts.def()
    }
}

impl Related<super::games::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Games.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

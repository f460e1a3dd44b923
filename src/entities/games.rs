use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "games")]
pub struct Model {
    /// Steam app id
    #[sea_orm(primary_key, auto_increment = false)]
    pub app_id: i32,

    pub name: String,

    pub icon_url: Option<String>,

    pub header_image_url: Option<String>,

    pub price_currency: Option<String>,

    /// Prices are in the currency's minor unit (cents).
    pub price_initial: Option<i32>,

    pub price_final: Option<i32>,

    pub price_discount_percent: Option<i32>,

    pub price_last_fetched_at: Option<String>,

    #[sea_orm(default_value = 0)]
    pub price_fetch_attempts: i32,

    pub cached_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::owned_games::Entity")]
    OwnedGames,
}

impl Related<super::owned_games::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OwnedGames.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

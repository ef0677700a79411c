use common::Rank;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rating record. Created together with its user, one row per user.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// Never negative.
    pub rating: i32,
    pub rank: Rank,

    pub is_online: bool,
    pub last_seen: Option<DateTimeUtc>,

    pub total_battles: i32,
    pub wins: i32,
    pub losses: i32,
    /// Consecutive wins.
    pub streak: i32,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use common::ViolationKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only record of a client-reported violation.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "anti_cheat_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    pub match_id: i32,
    pub kind: ViolationKind,
    #[sea_orm(column_type = "Text", nullable)]
    pub details: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

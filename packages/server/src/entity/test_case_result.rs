use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_case_result")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "submission_test_case")]
    pub submission_id: i32,
    #[sea_orm(unique_key = "submission_test_case")]
    pub test_case_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    pub position: i32,
    pub passed: bool,
    pub status_description: String,

    pub time_ms: Option<f64>,   // in milliseconds
    pub memory_kb: Option<i64>, // in kilobytes

    #[sea_orm(column_type = "Text", nullable)]
    pub actual_output: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_text: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

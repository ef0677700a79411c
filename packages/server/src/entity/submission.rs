use common::SubmissionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub match_id: i32,
    #[sea_orm(belongs_to, from = "match_id", to = "id")]
    pub duel: HasOne<super::matches::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub problem_id: i32,
    pub language: String,
    #[sea_orm(column_type = "Text")]
    pub source_code: String,

    pub status: SubmissionStatus,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub average_time_ms: f64,
    pub average_memory_kb: f64,
    /// Set when judging failed internally.
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    #[sea_orm(has_many)]
    pub results: HasMany<super::test_case_result::Entity>,

    pub created_at: DateTimeUtc,
    /// Last status change. Used to detect judging runs that never finished.
    pub updated_at: DateTimeUtc,
    pub judged_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}

use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use sea_orm::*;

use crate::entity::submission;

const IN_FLIGHT: [SubmissionStatus; 2] = [SubmissionStatus::Pending, SubmissionStatus::Judging];

pub async fn create<C: ConnectionTrait>(
    db: &C,
    match_id: i32,
    user_id: i32,
    problem_id: i32,
    language: &str,
    source_code: &str,
) -> Result<submission::Model, DbErr> {
    let now = Utc::now();
    submission::ActiveModel {
        match_id: Set(match_id),
        user_id: Set(user_id),
        problem_id: Set(problem_id),
        language: Set(language.to_string()),
        source_code: Set(source_code.to_string()),
        status: Set(SubmissionStatus::Pending),
        test_cases_passed: Set(0),
        total_test_cases: Set(0),
        average_time_ms: Set(0.0),
        average_memory_kb: Set(0.0),
        error_message: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        judged_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn find<C: ConnectionTrait>(
    db: &C,
    submission_id: i32,
) -> Result<Option<submission::Model>, DbErr> {
    submission::Entity::find_by_id(submission_id).one(db).await
}

/// PENDING -> JUDGING. Returns false if another worker got there first.
pub async fn mark_judging<C: ConnectionTrait>(db: &C, submission_id: i32) -> Result<bool, DbErr> {
    let res = submission::Entity::update_many()
        .set(submission::ActiveModel {
            status: Set(SubmissionStatus::Judging),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(submission::Column::Id.eq(submission_id))
        .filter(submission::Column::Status.eq(SubmissionStatus::Pending))
        .exec(db)
        .await?;
    Ok(res.rows_affected == 1)
}

/// Move an in-flight submission to RUNTIME_ERROR. No-op once it has a verdict.
pub async fn fail<C: ConnectionTrait>(
    db: &C,
    submission_id: i32,
    message: &str,
) -> Result<bool, DbErr> {
    let now = Utc::now();
    let res = submission::Entity::update_many()
        .set(submission::ActiveModel {
            status: Set(SubmissionStatus::RuntimeError),
            error_message: Set(Some(message.to_string())),
            updated_at: Set(now),
            judged_at: Set(Some(now)),
            ..Default::default()
        })
        .filter(submission::Column::Id.eq(submission_id))
        .filter(submission::Column::Status.is_in(IN_FLIGHT))
        .exec(db)
        .await?;
    Ok(res.rows_affected == 1)
}

/// The player's most recent submission in this match that has a verdict.
pub async fn latest_terminal_for<C: ConnectionTrait>(
    db: &C,
    match_id: i32,
    user_id: i32,
) -> Result<Option<submission::Model>, DbErr> {
    submission::Entity::find()
        .filter(submission::Column::MatchId.eq(match_id))
        .filter(submission::Column::UserId.eq(user_id))
        .filter(submission::Column::Status.is_not_in(IN_FLIGHT))
        .order_by_desc(submission::Column::Id)
        .one(db)
        .await
}

pub async fn pending_ids<C: ConnectionTrait>(db: &C) -> Result<Vec<i32>, DbErr> {
    submission::Entity::find()
        .select_only()
        .column(submission::Column::Id)
        .filter(submission::Column::Status.eq(SubmissionStatus::Pending))
        .order_by_asc(submission::Column::Id)
        .into_tuple()
        .all(db)
        .await
}

/// JUDGING submissions whose last status change is older than `cutoff`.
pub async fn stuck_judging_ids<C: ConnectionTrait>(
    db: &C,
    cutoff: DateTime<Utc>,
) -> Result<Vec<i32>, DbErr> {
    submission::Entity::find()
        .select_only()
        .column(submission::Column::Id)
        .filter(submission::Column::Status.eq(SubmissionStatus::Judging))
        .filter(submission::Column::UpdatedAt.lt(cutoff))
        .into_tuple()
        .all(db)
        .await
}

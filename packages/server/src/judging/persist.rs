use chrono::Utc;
use common::SubmissionStatus;
use common::judge_result::JudgeResult;
use sea_orm::*;
use tracing::info;

use crate::entity::{submission, test_case_result};

/// Store a verdict and its per-case rows in one transaction.
///
/// Only a JUDGING submission accepts a verdict. Returns the updated row, or
/// `None` if the submission already had one (redelivery).
pub async fn persist_judge_result(
    db: &DatabaseConnection,
    result: &JudgeResult,
) -> Result<Option<submission::Model>, DbErr> {
    let txn = db.begin().await?;
    let now = Utc::now();

    let updated = submission::Entity::update_many()
        .set(submission::ActiveModel {
            status: Set(result.status),
            test_cases_passed: Set(result.test_cases_passed),
            total_test_cases: Set(result.total_test_cases),
            average_time_ms: Set(result.average_time_ms),
            average_memory_kb: Set(result.average_memory_kb),
            error_message: Set(result.error_message.clone()),
            updated_at: Set(now),
            judged_at: Set(Some(now)),
            ..Default::default()
        })
        .filter(submission::Column::Id.eq(result.submission_id))
        .filter(submission::Column::Status.eq(SubmissionStatus::Judging))
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        info!(
            submission_id = result.submission_id,
            "Submission already has a verdict, skipping"
        );
        txn.rollback().await?;
        return Ok(None);
    }

    for (position, tc_result) in result.test_case_results.iter().enumerate() {
        test_case_result::ActiveModel {
            submission_id: Set(result.submission_id),
            test_case_id: Set(tc_result.test_case_id),
            position: Set(position as i32),
            passed: Set(tc_result.passed),
            status_description: Set(tc_result.status_description.clone()),
            time_ms: Set(tc_result.time_ms),
            memory_kb: Set(tc_result.memory_kb),
            actual_output: Set(tc_result.actual_output.clone()),
            error_text: Set(tc_result.error_text.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(
        submission_id = result.submission_id,
        job_id = %result.job_id,
        status = %result.status,
        passed = result.test_cases_passed,
        total = result.total_test_cases,
        "Stored judge result"
    );

    submission::Entity::find_by_id(result.submission_id)
        .one(db)
        .await
}

/// Per-case rows of a submission in judging order.
pub async fn test_case_results<C: ConnectionTrait>(
    db: &C,
    submission_id: i32,
) -> Result<Vec<test_case_result::Model>, DbErr> {
    test_case_result::Entity::find()
        .filter(test_case_result::Column::SubmissionId.eq(submission_id))
        .order_by_asc(test_case_result::Column::Position)
        .all(db)
        .await
}

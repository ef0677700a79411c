//! Judging pipeline: submission -> execution service -> verdict -> match policy.

pub mod persist;
pub mod queue;
pub mod recovery;

use std::sync::Arc;

use common::event::{ServerEvent, SubmissionUpdatePayload};
use common::judge_job::{JudgeJob, TestCaseData};
use sea_orm::DatabaseConnection;
use tracing::{debug, error, instrument, warn};
use worker::{ExecutionClient, ExecutionConfig, run_judge_job};

use crate::coordinator::MatchCoordinator;
use crate::entity::submission;
use crate::error::CoreError;
use crate::fanout::Fanout;
use crate::rating;
use crate::store::{self, RatingLedger};

pub use persist::persist_judge_result;
pub use queue::{JudgeQueue, QueueClosed};

pub struct JudgePipeline {
    db: DatabaseConnection,
    client: Arc<dyn ExecutionClient>,
    execution: ExecutionConfig,
    fanout: Arc<Fanout>,
    ledger: Arc<RatingLedger>,
    coordinator: Arc<MatchCoordinator>,
}

impl JudgePipeline {
    pub fn new(
        db: DatabaseConnection,
        client: Arc<dyn ExecutionClient>,
        execution: ExecutionConfig,
        fanout: Arc<Fanout>,
        ledger: Arc<RatingLedger>,
        coordinator: Arc<MatchCoordinator>,
    ) -> Self {
        Self {
            db,
            client,
            execution,
            fanout,
            ledger,
            coordinator,
        }
    }

    pub fn execution(&self) -> &ExecutionConfig {
        &self.execution
    }

    /// Judge one submission. Never fails; errors end in RUNTIME_ERROR.
    #[instrument(skip(self))]
    pub async fn judge(&self, submission_id: i32) {
        if let Err(e) = self.try_judge(submission_id).await {
            error!(submission_id, error = %e, "Judging failed");
            self.fail_submission(submission_id, &e.to_string()).await;
        }
    }

    async fn try_judge(&self, submission_id: i32) -> Result<(), CoreError> {
        let Some(pending) = store::submissions::find(&self.db, submission_id).await? else {
            warn!(submission_id, "Submission not found, skipping");
            return Ok(());
        };
        if pending.status.is_final() {
            debug!(submission_id, status = %pending.status, "Submission already judged");
            return Ok(());
        }
        if !store::submissions::mark_judging(&self.db, submission_id).await? {
            debug!(submission_id, "Submission picked up elsewhere");
            return Ok(());
        }

        let problem = store::problems::get_problem(&self.db, pending.problem_id).await?;
        let test_cases = store::problems::get_test_cases(&self.db, problem.id)
            .await?
            .into_iter()
            .map(|tc| TestCaseData {
                id: tc.id,
                input: tc.input,
                expected_output: tc.expected_output,
            })
            .collect();

        let job = JudgeJob::new(
            pending.id,
            pending.match_id,
            pending.user_id,
            pending.problem_id,
            pending.source_code,
            pending.language,
            problem.time_limit_ms,
            problem.memory_limit_mb,
            test_cases,
        );
        let result = run_judge_job(self.client.as_ref(), &self.execution, &job).await;

        match persist_judge_result(&self.db, &result).await? {
            Some(judged) => self.complete(&judged).await,
            None => Ok(()),
        }
    }

    /// Points, notification and the match completion policy for a verdict.
    async fn complete(&self, judged: &submission::Model) -> Result<(), CoreError> {
        if judged.test_cases_passed > 0 {
            let passed = judged.test_cases_passed;
            let outcome = self
                .ledger
                .apply(&self.db, judged.user_id, |config, profile| {
                    rating::test_case_points(config, profile, passed)
                })
                .await?;
            if outcome.rating_changed() {
                let update = store::profiles::user_update(&self.db, judged.user_id).await?;
                self.fanout.publish_global(ServerEvent::UserUpdate(update));
            }
        }

        self.fanout.publish_to_match(
            judged.match_id,
            ServerEvent::SubmissionUpdate(SubmissionUpdatePayload {
                submission_id: judged.id,
                user_id: judged.user_id,
                status: judged.status,
                test_cases_passed: judged.test_cases_passed,
                total_test_cases: judged.total_test_cases,
                average_time_ms: judged.average_time_ms,
                average_memory_kb: judged.average_memory_kb,
                error_message: judged.error_message.clone(),
            }),
        );

        self.coordinator.on_submission_judged(judged).await?;
        Ok(())
    }

    /// Move an in-flight submission to RUNTIME_ERROR and let the match react.
    pub async fn fail_submission(&self, submission_id: i32, message: &str) {
        match store::submissions::fail(&self.db, submission_id, message).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                error!(submission_id, error = %e, "Failed to mark submission as errored");
                return;
            }
        }

        let failed = match store::submissions::find(&self.db, submission_id).await {
            Ok(Some(failed)) => failed,
            Ok(None) => return,
            Err(e) => {
                error!(submission_id, error = %e, "Failed to reload errored submission");
                return;
            }
        };
        if let Err(e) = self.complete(&failed).await {
            error!(submission_id, error = %e, "Failed to settle errored submission");
        }
    }
}

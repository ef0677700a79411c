use common::judge_job::{JudgeJob, TestCaseData};
use common::judge_result::{JudgeResult, TestCaseJudgeResult};
use tracing::{info, instrument, warn};

use crate::config::ExecutionConfig;
use crate::error::ExecutionError;
use crate::models::execution::{ExecutionClient, ExecutionRequest, ExecutionResponse};

/// Output comparison used for grading: trailing whitespace is ignored on both sides.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim_end() == expected.trim_end()
}

/// Run every test case of `job` through `client` and aggregate the verdict.
///
/// Test cases run sequentially in job order. Each call is bounded by the
/// configured timeout; a failed call becomes a failing case result and does
/// not abort the remaining cases.
#[instrument(skip_all, fields(submission_id = job.submission_id, job_id = %job.job_id))]
pub async fn run_judge_job(
    client: &dyn ExecutionClient,
    config: &ExecutionConfig,
    job: &JudgeJob,
) -> JudgeResult {
    let language_id = config.language_id(&job.language);
    let timeout = config.timeout();
    let mut results = Vec::with_capacity(job.test_cases.len());

    for tc in &job.test_cases {
        let outcome = match language_id {
            None => Err(ExecutionError::UnsupportedLanguage(job.language.clone())),
            Some(language_id) => {
                let request = ExecutionRequest {
                    source_code: job.source_code.clone(),
                    language_id,
                    stdin: tc.input.clone(),
                    expected_output: Some(tc.expected_output.clone()),
                    cpu_time_limit_secs: (job.time_limit_ms > 0)
                        .then(|| job.time_limit_ms as f64 / 1000.0),
                    memory_limit_kb: (job.memory_limit_mb > 0)
                        .then(|| job.memory_limit_mb as i64 * 1024),
                };
                match tokio::time::timeout(timeout, client.execute(&request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ExecutionError::Timeout(timeout)),
                }
            }
        };

        let result = match outcome {
            Ok(response) => grade(tc, response),
            Err(e) => {
                warn!(test_case_id = tc.id, error = %e, "Execution call failed");
                TestCaseJudgeResult::errored(tc.id, e.status_description(), e.to_string())
            }
        };
        results.push(result);
    }

    let result = JudgeResult::aggregate(job.job_id.clone(), job.submission_id, results);
    info!(
        status = %result.status,
        passed = result.test_cases_passed,
        total = result.total_test_cases,
        "Judging completed"
    );
    result
}

fn grade(tc: &TestCaseData, response: ExecutionResponse) -> TestCaseJudgeResult {
    let stdout = response.stdout.clone().unwrap_or_default();
    let passed = response.is_accepted() && outputs_match(&stdout, &tc.expected_output);

    TestCaseJudgeResult {
        test_case_id: tc.id,
        passed,
        error_text: response.diagnostics(),
        status_description: response.status_description,
        actual_output: Some(stdout),
        time_ms: response.time_ms,
        memory_kb: response.memory_kb,
    }
}

use crate::SubmissionStatus;
use serde::{Deserialize, Serialize};

/// Result for a single test case execution.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TestCaseJudgeResult {
    /// Test case ID that was executed.
    pub test_case_id: i32,
    /// Service verdict matched "accepted" and the trimmed output was identical.
    pub passed: bool,
    /// Execution status as described by the sandbox (or the local error).
    pub status_description: String,
    /// Program stdout.
    pub actual_output: Option<String>,
    /// Time used in milliseconds. `None` when the case never ran.
    pub time_ms: Option<f64>,
    /// Memory used in kilobytes. `None` when the case never ran.
    pub memory_kb: Option<i64>,
    /// stderr, compiler output or the client-side error, whichever applies.
    pub error_text: Option<String>,
}

impl TestCaseJudgeResult {
    /// A case that could not be executed at all.
    pub fn errored(test_case_id: i32, description: impl Into<String>, error: String) -> Self {
        Self {
            test_case_id,
            passed: false,
            status_description: description.into(),
            actual_output: None,
            time_ms: None,
            memory_kb: None,
            error_text: Some(error),
        }
    }
}

/// Aggregated outcome of judging one submission.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JudgeResult {
    /// Original job ID.
    pub job_id: String,
    /// Submission that was judged.
    pub submission_id: i32,
    /// Final status after judging.
    pub status: SubmissionStatus,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    /// Mean over the cases that reported a time measurement.
    pub average_time_ms: f64,
    /// Mean over the cases that reported a memory measurement.
    pub average_memory_kb: f64,
    /// Set only when judging failed internally.
    pub error_message: Option<String>,
    /// Individual test case results, in job order.
    pub test_case_results: Vec<TestCaseJudgeResult>,
}

impl JudgeResult {
    /// Fold per-case results into the submission verdict.
    ///
    /// ACCEPTED iff every case passed and there was at least one case.
    /// Averages ignore cases without a measurement so that cases which never
    /// ran do not drag the mean toward zero.
    pub fn aggregate(
        job_id: String,
        submission_id: i32,
        test_case_results: Vec<TestCaseJudgeResult>,
    ) -> Self {
        let total = test_case_results.len() as i32;
        let passed = test_case_results.iter().filter(|r| r.passed).count() as i32;

        let times: Vec<f64> = test_case_results.iter().filter_map(|r| r.time_ms).collect();
        let memories: Vec<f64> = test_case_results
            .iter()
            .filter_map(|r| r.memory_kb)
            .map(|m| m as f64)
            .collect();

        let status = if total > 0 && passed == total {
            SubmissionStatus::Accepted
        } else {
            SubmissionStatus::WrongAnswer
        };

        Self {
            job_id,
            submission_id,
            status,
            test_cases_passed: passed,
            total_test_cases: total,
            average_time_ms: mean(&times),
            average_memory_kb: mean(&memories),
            error_message: None,
            test_case_results,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

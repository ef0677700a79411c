use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Test case data needed for judging.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCaseData {
    /// Test case ID
    pub id: i32,
    /// Input data to feed to the program
    pub input: String,
    /// Expected output for comparison
    pub expected_output: String,
}

/// Everything a judge worker needs to grade one submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeJob {
    /// Job identifier (UUID), used to correlate log lines.
    pub job_id: String,
    pub submission_id: i32,
    pub match_id: i32,
    pub user_id: i32,
    pub problem_id: i32,
    pub source_code: String,
    /// Language key as submitted by the client (e.g. "cpp", "python").
    pub language: String,
    /// Time limit in milliseconds
    pub time_limit_ms: i32,
    /// Memory limit in megabytes
    pub memory_limit_mb: i32,
    /// Test cases in reporting order.
    pub test_cases: Vec<TestCaseData>,
}

impl JudgeJob {
    /// Create a new judge job with a generated UUID.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        submission_id: i32,
        match_id: i32,
        user_id: i32,
        problem_id: i32,
        source_code: String,
        language: String,
        time_limit_ms: i32,
        memory_limit_mb: i32,
        test_cases: Vec<TestCaseData>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            submission_id,
            match_id,
            user_id,
            problem_id,
            source_code,
            language,
            time_limit_ms,
            memory_limit_mb,
            test_cases,
        }
    }

    /// Get the test case IDs from this job.
    pub fn test_case_ids(&self) -> Vec<i32> {
        self.test_cases.iter().map(|tc| tc.id).collect()
    }
}

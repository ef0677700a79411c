use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use serde::Serialize;

use crate::entity::{submission, test_case_result};

#[derive(Serialize, utoipa::ToSchema)]
pub struct TestCaseResultResponse {
    pub test_case_id: i32,
    pub position: i32,
    pub passed: bool,
    #[schema(example = "Accepted")]
    pub status_description: String,
    pub time_ms: Option<f64>,
    pub memory_kb: Option<i64>,
    pub actual_output: Option<String>,
    pub error_text: Option<String>,
}

impl From<test_case_result::Model> for TestCaseResultResponse {
    fn from(r: test_case_result::Model) -> Self {
        Self {
            test_case_id: r.test_case_id,
            position: r.position,
            passed: r.passed,
            status_description: r.status_description,
            time_ms: r.time_ms,
            memory_kb: r.memory_kb,
            actual_output: r.actual_output,
            error_text: r.error_text,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub match_id: i32,
    pub user_id: i32,
    pub problem_id: i32,
    #[schema(example = "python")]
    pub language: String,
    pub source_code: String,
    pub status: SubmissionStatus,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub average_time_ms: f64,
    pub average_memory_kb: f64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub judged_at: Option<DateTime<Utc>>,
    /// Per-case results in judging order. Empty until judged.
    pub results: Vec<TestCaseResultResponse>,
}

impl SubmissionResponse {
    pub fn new(s: submission::Model, results: Vec<test_case_result::Model>) -> Self {
        Self {
            id: s.id,
            match_id: s.match_id,
            user_id: s.user_id,
            problem_id: s.problem_id,
            language: s.language,
            source_code: s.source_code,
            status: s.status,
            test_cases_passed: s.test_cases_passed,
            total_test_cases: s.total_test_cases,
            average_time_ms: s.average_time_ms,
            average_memory_kb: s.average_memory_kb,
            error_message: s.error_message,
            created_at: s.created_at,
            judged_at: s.judged_at,
            results: results.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LanguageResponse {
    /// Value to send as `language` when submitting.
    #[schema(example = "python")]
    pub key: String,
    /// Id used by the execution service.
    #[schema(example = 71)]
    pub language_id: i32,
}

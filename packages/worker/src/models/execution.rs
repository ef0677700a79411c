use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One program run against one input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language_id: i32,
    pub stdin: String,
    pub expected_output: Option<String>,
    /// CPU time limit in seconds, forwarded to the sandbox.
    pub cpu_time_limit_secs: Option<f64>,
    /// Memory limit in kilobytes, forwarded to the sandbox.
    pub memory_limit_kb: Option<i64>,
}

/// Normalized outcome of an execution call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExecutionResponse {
    pub status_id: i32,
    pub status_description: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub time_ms: Option<f64>,
    pub memory_kb: Option<i64>,
}

impl ExecutionResponse {
    /// Judge0 status id for "Accepted".
    pub const ACCEPTED: i32 = 3;

    pub fn is_accepted(&self) -> bool {
        self.status_id == Self::ACCEPTED
    }

    /// The most useful diagnostic text, compiler output first.
    pub fn diagnostics(&self) -> Option<String> {
        self.compile_output
            .as_ref()
            .filter(|s| !s.is_empty())
            .or(self.stderr.as_ref().filter(|s| !s.is_empty()))
            .cloned()
    }
}

/// Runs source code in a remote sandbox.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResponse>;
}

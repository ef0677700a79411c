//! HTTP client for Judge0-compatible execution services.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::config::ExecutionConfig;
use crate::error::{ExecutionError, Result};
use crate::models::execution::{ExecutionClient, ExecutionRequest, ExecutionResponse};

#[derive(Serialize)]
struct SubmissionBody {
    source_code: String,
    language_id: i32,
    stdin: Option<String>,
    expected_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpu_time_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_limit: Option<i64>,
}

#[derive(Deserialize)]
struct StatusBody {
    id: i32,
    description: String,
}

#[derive(Deserialize)]
struct ResultBody {
    status: Option<StatusBody>,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    /// Seconds, usually sent as a decimal string.
    #[serde(default, deserialize_with = "de_seconds")]
    time: Option<f64>,
    memory: Option<i64>,
    error: Option<String>,
}

fn de_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode a base64 field. Falls back to the raw text when it is not valid base64.
fn decode(field: Option<String>) -> Option<String> {
    field.map(|raw| {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        match STANDARD.decode(compact.as_bytes()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(error = %e, "Failed to decode base64 field, keeping raw text");
                raw
            }
        }
    })
}

pub struct Judge0Client {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: std::time::Duration,
}

impl Judge0Client {
    pub fn new(config: &ExecutionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ExecutionError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            timeout: config.timeout(),
        })
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ExecutionError {
        if err.is_timeout() {
            ExecutionError::Timeout(self.timeout)
        } else if err.is_decode() {
            ExecutionError::Malformed(err.to_string())
        } else {
            ExecutionError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl ExecutionClient for Judge0Client {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResponse> {
        let body = SubmissionBody {
            source_code: encode(&request.source_code),
            language_id: request.language_id,
            stdin: (!request.stdin.is_empty()).then(|| encode(&request.stdin)),
            expected_output: request
                .expected_output
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(encode),
            cpu_time_limit: request.cpu_time_limit_secs,
            memory_limit: request.memory_limit_kb,
        };

        debug!(
            language_id = request.language_id,
            code_len = request.source_code.len(),
            "Sending submission to execution service"
        );

        let mut builder = self
            .http
            .post(format!("{}/submissions", self.base_url))
            .query(&[("base64_encoded", "true"), ("wait", "true")])
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-RapidAPI-Key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExecutionError::Service(format!("HTTP {status}: {text}")));
        }

        let result: ResultBody = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if let Some(error) = result.error {
            return Err(ExecutionError::Service(error));
        }
        let status = result
            .status
            .ok_or_else(|| ExecutionError::Malformed("missing status".into()))?;

        Ok(ExecutionResponse {
            status_id: status.id,
            status_description: status.description,
            stdout: decode(result.stdout),
            stderr: decode(result.stderr),
            compile_output: decode(result.compile_output),
            time_ms: result.time.map(|secs| secs * 1000.0),
            memory_kb: result.memory,
        })
    }
}

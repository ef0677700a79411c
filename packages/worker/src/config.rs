use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Settings for the remote code execution service.
#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    /// Base URL of the Judge0-compatible service. Default: "http://localhost:2358".
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `X-RapidAPI-Key` when present.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Upper bound for a single execution call. Default: 30.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Language key to service language id.
    #[serde(default = "default_languages")]
    pub languages: HashMap<String, i32>,
}

fn default_base_url() -> String {
    "http://localhost:2358".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_languages() -> HashMap<String, i32> {
    HashMap::from([
        ("cpp".to_string(), 54),
        ("python".to_string(), 71),
        ("java".to_string(), 62),
        ("c".to_string(), 50),
        ("js".to_string(), 63),
    ])
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            languages: default_languages(),
        }
    }
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve a client language key (case-insensitive) or a raw numeric id.
    pub fn language_id(&self, language: &str) -> Option<i32> {
        let key = language.trim();
        if let Ok(id) = key.parse::<i32>() {
            return self.languages.values().any(|v| *v == id).then_some(id);
        }
        self.languages.get(&key.to_lowercase()).copied()
    }

    pub fn supports(&self, language: &str) -> bool {
        self.language_id(language).is_some()
    }
}

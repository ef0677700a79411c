pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

pub use config::ExecutionConfig;
pub use error::{ExecutionError, Result};
pub use handlers::judge::run_judge_job;
pub use models::execution::{ExecutionClient, ExecutionRequest, ExecutionResponse};
pub use models::judge0::Judge0Client;

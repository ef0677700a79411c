use std::sync::Arc;

use anyhow::Context;
use server::config::AppConfig;
use server::database::init_db;
use server::judging::recovery::{recover_submissions, run_maintenance};
use server::seed::seed_sample_problems;
use server::state::AppState;
use tracing::{Level, info};
use worker::Judge0Client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    if config.database.seed_sample_problems {
        seed_sample_problems(&db).await?;
    }

    let client = Judge0Client::new(&config.judge.execution())?;
    let state = AppState::new(db.clone(), config.clone(), Arc::new(client))?;

    recover_submissions(&db, &state.pipeline, &state.judge_queue, &config.judge).await?;
    tokio::spawn(run_maintenance(
        db,
        state.coordinator.clone(),
        state.pipeline.clone(),
        state.judge_queue.clone(),
        config.matches.clone(),
        config.judge.clone(),
    ));

    let app = server::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

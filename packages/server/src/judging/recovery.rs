use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tracing::{error, info};

use crate::config::{JudgeConfig, MatchConfig};
use crate::coordinator::MatchCoordinator;
use crate::store;

use super::{JudgePipeline, JudgeQueue};

/// Fail JUDGING submissions older than `stuck_after` that no worker in this
/// process is still running. A live job keeps its row however long it takes.
pub async fn fail_stuck_submissions(
    db: &DatabaseConnection,
    pipeline: &JudgePipeline,
    queue: &JudgeQueue,
    stuck_after: Duration,
) -> anyhow::Result<usize> {
    let cutoff = Utc::now() - chrono::Duration::from_std(stuck_after)?;
    let stuck: Vec<i32> = store::submissions::stuck_judging_ids(db, cutoff)
        .await?
        .into_iter()
        .filter(|id| !queue.is_running(*id))
        .collect();
    if stuck.is_empty() {
        return Ok(0);
    }

    info!(count = stuck.len(), "Found stuck submissions");
    for submission_id in &stuck {
        pipeline
            .fail_submission(
                *submission_id,
                &format!(
                    "Judging did not finish within {} seconds",
                    stuck_after.as_secs()
                ),
            )
            .await;
    }
    Ok(stuck.len())
}

/// Startup recovery: fail stuck submissions and requeue pending ones.
pub async fn recover_submissions(
    db: &DatabaseConnection,
    pipeline: &JudgePipeline,
    queue: &JudgeQueue,
    config: &JudgeConfig,
) -> anyhow::Result<()> {
    let failed = fail_stuck_submissions(
        db,
        pipeline,
        queue,
        Duration::from_secs(config.stuck_after_secs),
    )
    .await?;

    let pending = store::submissions::pending_ids(db).await?;
    for submission_id in &pending {
        queue.enqueue(*submission_id).await?;
    }

    info!(
        failed,
        requeued = pending.len(),
        "Recovered submissions"
    );
    Ok(())
}

/// Periodic maintenance: expire stale pending matches and fail stuck submissions.
pub async fn run_maintenance(
    db: DatabaseConnection,
    coordinator: Arc<MatchCoordinator>,
    pipeline: Arc<JudgePipeline>,
    queue: JudgeQueue,
    matches: MatchConfig,
    judge: JudgeConfig,
) {
    let scan_interval = Duration::from_secs(matches.sweep_interval_secs.max(1));
    info!(
        pending_ttl_secs = matches.pending_ttl_secs,
        stuck_after_secs = judge.stuck_after_secs,
        scan_interval_secs = scan_interval.as_secs(),
        "Starting maintenance sweeper"
    );

    let mut interval = tokio::time::interval(scan_interval);
    loop {
        interval.tick().await;

        if let Err(e) = coordinator
            .expire_stale_matches(Duration::from_secs(matches.pending_ttl_secs))
            .await
        {
            error!(error = %e, "Stale match sweep failed");
        }
        if let Err(e) = fail_stuck_submissions(
            &db,
            &pipeline,
            &queue,
            Duration::from_secs(judge.stuck_after_secs),
        )
        .await
        {
            error!(error = %e, "Stuck submission sweep failed");
        }
    }
}

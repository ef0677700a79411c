use std::sync::Arc;

use dashmap::DashSet;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info};

use super::JudgePipeline;

#[derive(Debug, Error)]
#[error("judge queue is closed")]
pub struct QueueClosed;

/// Bounded in-process queue of submission ids feeding a fixed worker pool.
#[derive(Clone)]
pub struct JudgeQueue {
    tx: mpsc::Sender<i32>,
    running: Arc<DashSet<i32>>,
}

impl JudgeQueue {
    /// Spawn `workers` judge workers. Must be called inside a Tokio runtime.
    pub fn start(pipeline: Arc<JudgePipeline>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let running = Arc::new(DashSet::new());

        let workers = workers.max(1);
        for worker_id in 0..workers {
            tokio::spawn(run_worker(
                worker_id,
                pipeline.clone(),
                rx.clone(),
                running.clone(),
            ));
        }
        info!(workers, capacity, "Started judge workers");

        Self { tx, running }
    }

    /// Waits for room when the queue is full.
    pub async fn enqueue(&self, submission_id: i32) -> Result<(), QueueClosed> {
        self.tx.send(submission_id).await.map_err(|_| QueueClosed)
    }

    /// Whether a worker in this process is judging `submission_id` right now.
    pub fn is_running(&self, submission_id: i32) -> bool {
        self.running.contains(&submission_id)
    }
}

async fn run_worker(
    worker_id: usize,
    pipeline: Arc<JudgePipeline>,
    rx: Arc<Mutex<mpsc::Receiver<i32>>>,
    running: Arc<DashSet<i32>>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(submission_id) = next else {
            info!(worker_id, "Judge queue closed, worker exiting");
            return;
        };

        running.insert(submission_id);
        // Run each job in its own task so a panic is caught here.
        let task = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.judge(submission_id).await })
        };
        if let Err(e) = task.await {
            error!(worker_id, submission_id, error = %e, "Judge task panicked");
            pipeline
                .fail_submission(submission_id, "Internal error while judging")
                .await;
        }
        running.remove(&submission_id);
    }
}

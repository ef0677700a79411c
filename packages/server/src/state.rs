use std::sync::Arc;

use sea_orm::DatabaseConnection;
use worker::ExecutionClient;

use crate::anti_cheat::AntiCheatEvaluator;
use crate::config::AppConfig;
use crate::coordinator::MatchCoordinator;
use crate::fanout::{EventRegistry, Fanout, FanoutError};
use crate::judging::{JudgePipeline, JudgeQueue};
use crate::lobby::Lobby;
use crate::presence::PresenceTracker;
use crate::store::RatingLedger;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub fanout: Arc<Fanout>,
    pub presence: Arc<PresenceTracker>,
    pub ledger: Arc<RatingLedger>,
    pub coordinator: Arc<MatchCoordinator>,
    pub lobby: Arc<Lobby>,
    pub anti_cheat: Arc<AntiCheatEvaluator>,
    pub pipeline: Arc<JudgePipeline>,
    pub judge_queue: JudgeQueue,
}

impl AppState {
    /// Wire the components together and start the judge workers.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        client: Arc<dyn ExecutionClient>,
    ) -> Result<Self, FanoutError> {
        let fanout = Arc::new(Fanout::new(
            EventRegistry::standard(),
            Fanout::DEFAULT_CAPACITY,
        )?);
        let presence = Arc::new(PresenceTracker::new(fanout.clone()));
        let ledger = Arc::new(RatingLedger::new(config.rating.clone()));
        let coordinator = Arc::new(MatchCoordinator::new(
            db.clone(),
            fanout.clone(),
            presence.clone(),
            ledger.clone(),
            config.stats.clone(),
        ));
        let lobby = Arc::new(Lobby::new(
            db.clone(),
            fanout.clone(),
            coordinator.clone(),
        ));
        let anti_cheat = Arc::new(AntiCheatEvaluator::new(
            db.clone(),
            coordinator.clone(),
            config.anti_cheat.clone(),
        ));
        let pipeline = Arc::new(JudgePipeline::new(
            db.clone(),
            client,
            config.judge.execution(),
            fanout.clone(),
            ledger.clone(),
            coordinator.clone(),
        ));
        let judge_queue = JudgeQueue::start(
            pipeline.clone(),
            config.judge.workers,
            config.judge.queue_capacity,
        );

        Ok(Self {
            db,
            config: Arc::new(config),
            fanout,
            presence,
            ledger,
            coordinator,
            lobby,
            anti_cheat,
            pipeline,
            judge_queue,
        })
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use common::ViolationKind;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::AntiCheatConfig;
use crate::coordinator::MatchCoordinator;
use crate::error::CoreError;
use crate::store;

/// What recording a violation led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationOutcome {
    /// Logged; no threshold reached.
    Logged,
    /// A threshold was reached and the match ended against the reporter.
    ForcedLoss,
    /// Logged, but the match was already over.
    Ignored,
}

impl AntiCheatConfig {
    pub fn threshold(&self, kind: ViolationKind) -> u64 {
        match kind {
            ViolationKind::PasteAction => self.paste_threshold,
            ViolationKind::TabSwitch => self.tab_switch_threshold,
            ViolationKind::SuspiciousTypingSpeed => self.typing_speed_threshold,
        }
    }
}

/// First kind, in [`ViolationKind::ALL`] order, whose count reached its threshold.
pub fn evaluate(
    counts: &HashMap<ViolationKind, u64>,
    thresholds: &AntiCheatConfig,
) -> Option<ViolationKind> {
    ViolationKind::ALL.into_iter().find(|kind| {
        counts.get(kind).copied().unwrap_or(0) >= thresholds.threshold(*kind)
    })
}

pub struct AntiCheatEvaluator {
    db: DatabaseConnection,
    coordinator: Arc<MatchCoordinator>,
    thresholds: AntiCheatConfig,
}

impl AntiCheatEvaluator {
    pub fn new(
        db: DatabaseConnection,
        coordinator: Arc<MatchCoordinator>,
        thresholds: AntiCheatConfig,
    ) -> Self {
        Self {
            db,
            coordinator,
            thresholds,
        }
    }

    #[instrument(skip(self, details))]
    pub async fn record(
        &self,
        match_id: i32,
        user_id: i32,
        kind: ViolationKind,
        details: Option<String>,
    ) -> Result<ViolationOutcome, CoreError> {
        let duel = store::matches::get(&self.db, match_id).await?;
        if !duel.is_participant(user_id) {
            return Err(CoreError::InvalidInput(format!(
                "User {user_id} is not a participant of match {match_id}"
            )));
        }

        store::anti_cheat::append(&self.db, match_id, user_id, kind, details).await?;
        if duel.status.is_terminal() {
            return Ok(ViolationOutcome::Ignored);
        }

        let counts = store::anti_cheat::counts_by_kind(&self.db, match_id, user_id).await?;
        let Some(violation) = evaluate(&counts, &self.thresholds) else {
            return Ok(ViolationOutcome::Logged);
        };

        info!(%violation, "Anti-cheat threshold reached");
        match self.coordinator.finalize_cheat(match_id, user_id).await? {
            Some(_) => Ok(ViolationOutcome::ForcedLoss),
            // Lost the race against another finalizer, or the match never started.
            None => Ok(ViolationOutcome::Logged),
        }
    }
}

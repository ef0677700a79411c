use chrono::{DateTime, Utc};
use common::{MatchEndReason, MatchStatus};
use serde::{Deserialize, Serialize};

use crate::entity::matches;

/// The caller becomes player 1.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateMatchRequest {
    #[schema(example = 2)]
    pub opponent_id: i32,
    /// Drawn at random when omitted.
    pub problem_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MatchResponse {
    pub id: i32,
    pub player1_id: i32,
    pub player2_id: i32,
    pub problem_id: i32,
    pub status: MatchStatus,
    pub winner_id: Option<i32>,
    pub loser_id: Option<i32>,
    pub end_reason: Option<MatchEndReason>,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl From<matches::Model> for MatchResponse {
    fn from(m: matches::Model) -> Self {
        Self {
            id: m.id,
            player1_id: m.player1_id,
            player2_id: m.player2_id,
            problem_id: m.problem_id,
            status: m.status,
            winner_id: m.winner_id,
            loser_id: m.loser_id,
            end_reason: m.end_reason,
            created_at: m.created_at,
            start_time: m.start_time,
            end_time: m.end_time,
        }
    }
}

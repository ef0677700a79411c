use common::{MatchEndReason, MatchStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A duel between two players on one problem.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "matches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub player1_id: i32,
    pub player2_id: i32,
    pub problem_id: i32,

    pub status: MatchStatus,
    /// NULL for draws, cheating and cancelled matches.
    pub winner_id: Option<i32>,
    pub loser_id: Option<i32>,
    pub end_reason: Option<MatchEndReason>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    pub created_at: DateTimeUtc,
    /// Set when the match becomes ACTIVE.
    pub start_time: Option<DateTimeUtc>,
    /// Set when the match reaches a terminal status.
    pub end_time: Option<DateTimeUtc>,
}

impl Model {
    pub fn is_participant(&self, user_id: i32) -> bool {
        self.player1_id == user_id || self.player2_id == user_id
    }

    /// The other player, if `user_id` takes part in this match.
    pub fn opponent_of(&self, user_id: i32) -> Option<i32> {
        if self.player1_id == user_id {
            Some(self.player2_id)
        } else if self.player2_id == user_id {
            Some(self.player1_id)
        } else {
            None
        }
    }

    pub fn players(&self) -> [i32; 2] {
        [self.player1_id, self.player2_id]
    }
}

impl ActiveModelBehavior for ActiveModel {}

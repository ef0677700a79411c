use chrono::{DateTime, Utc};
use common::Rank;
use common::event::PlayerSummary;
use serde::{Deserialize, Serialize};

use crate::entity::{user, user_profile};
use crate::store::profiles::win_rate;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    /// 1-32 characters, unique.
    #[schema(example = "alice")]
    pub username: String,
}

/// Public rating card of a player.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    #[schema(example = 1)]
    pub user_id: i32,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = 1215)]
    pub rating: i32,
    pub rank: Rank,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub total_battles: i32,
    pub wins: i32,
    pub losses: i32,
    /// Consecutive wins up to the latest battle.
    pub current_streak: i32,
    /// Percentage of battles won.
    #[schema(example = 62.5)]
    pub win_rate: f64,
    pub created_at: DateTime<Utc>,
}

impl ProfileResponse {
    pub fn new(user: user::Model, profile: user_profile::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            rating: profile.rating,
            rank: profile.rank,
            is_online: profile.is_online,
            last_seen: profile.last_seen,
            total_battles: profile.total_battles,
            wins: profile.wins,
            losses: profile.losses,
            current_streak: profile.streak,
            win_rate: win_rate(profile.wins, profile.total_battles),
            created_at: user.created_at,
        }
    }
}

/// An online player, as offered for a challenge.
#[derive(Serialize, utoipa::ToSchema)]
pub struct OnlinePlayerResponse {
    pub user_id: i32,
    #[schema(example = "bob")]
    pub username: String,
    #[schema(example = 1230)]
    pub rating: i32,
    pub rank: Rank,
}

impl From<PlayerSummary> for OnlinePlayerResponse {
    fn from(player: PlayerSummary) -> Self {
        Self {
            user_id: player.user_id,
            username: player.username,
            rating: player.rating,
            rank: player.rank,
        }
    }
}

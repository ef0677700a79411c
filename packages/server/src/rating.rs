//! Pure rating arithmetic. Persistence lives in [`crate::store::profiles`].

use common::Rank;

use crate::config::RatingConfig;

/// The part of a rating record the engine reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Profile {
    pub rating: i32,
    pub rank: Rank,
}

/// Result of applying a change to a [`Profile`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatingOutcome {
    pub before: Profile,
    pub after: Profile,
}

impl RatingOutcome {
    pub fn rank_changed(&self) -> bool {
        self.before.rank != self.after.rank
    }

    pub fn rating_changed(&self) -> bool {
        self.before.rating != self.after.rating
    }

    pub fn delta(&self) -> i32 {
        self.after.rating - self.before.rating
    }
}

impl RatingConfig {
    /// Highest tier whose threshold `rating` reaches.
    pub fn rank_for(&self, rating: i32) -> Rank {
        if rating >= self.diamond_threshold {
            Rank::Diamond
        } else if rating >= self.gold_threshold {
            Rank::Gold
        } else if rating >= self.silver_threshold {
            Rank::Silver
        } else {
            Rank::Bronze
        }
    }

    pub fn initial_profile(&self) -> Profile {
        Profile {
            rating: self.initial_rating,
            rank: self.rank_for(self.initial_rating),
        }
    }
}

/// Add `delta`, flooring the rating at zero, and recompute the rank.
pub fn apply_delta(config: &RatingConfig, profile: Profile, delta: i32) -> RatingOutcome {
    let rating = profile.rating.saturating_add(delta).max(0);
    RatingOutcome {
        before: profile,
        after: Profile {
            rating,
            rank: config.rank_for(rating),
        },
    }
}

fn win(config: &RatingConfig, profile: Profile) -> RatingOutcome {
    apply_delta(config, profile, config.win_points)
}

fn loss(config: &RatingConfig, profile: Profile) -> RatingOutcome {
    apply_delta(config, profile, -config.loss_points)
}

/// Winner gains `win_points`, loser drops `loss_points`.
pub fn match_result(
    config: &RatingConfig,
    winner: Profile,
    loser: Profile,
) -> (RatingOutcome, RatingOutcome) {
    (win(config, winner), loss(config, loser))
}

pub fn test_case_points(config: &RatingConfig, profile: Profile, passed: i32) -> RatingOutcome {
    apply_delta(
        config,
        profile,
        config.per_test_case_points.saturating_mul(passed.max(0)),
    )
}

pub fn cheat_penalty(config: &RatingConfig, cheater: Profile) -> RatingOutcome {
    apply_delta(config, cheater, -config.cheat_penalty)
}

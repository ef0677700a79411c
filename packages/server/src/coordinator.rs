//! Match lifecycle: creation, activation, finalization.
//!
//! Every status change for a match runs under that match's lock and is
//! written as a compare-and-set, so concurrent callers (two sockets, judge
//! workers, anti-cheat requests, the sweeper) can race freely. Whoever loses
//! the race gets a no-op.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::event::{
    MatchEndPayload, MatchStartPayload, PlayerSummary, ProblemSummary, RatingChange, ServerEvent,
};
use common::{MatchEndReason, MatchStatus};
use sea_orm::*;
use tracing::{debug, info, instrument, warn};

use crate::config::{DrawPolicy, StatsConfig};
use crate::entity::{matches, submission};
use crate::error::CoreError;
use crate::fanout::Fanout;
use crate::presence::PresenceTracker;
use crate::rating::{self, RatingOutcome};
use crate::store::{self, BattleOutcome, RatingLedger};
use crate::utils::locks::KeyedLocks;

/// What connecting to a match led to.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// Waiting for the opponent.
    Waiting,
    /// This join completed the pair; `match.start` went to both players.
    Activated(MatchStartPayload),
    /// The match was already running. The snapshot is for this connection only.
    Rejoined(MatchStartPayload),
    /// The match is over; the connection should not be registered.
    Ended(MatchStatus),
}

/// How a match ends.
#[derive(Debug, Clone, Copy)]
enum Ending {
    Win {
        winner: i32,
        loser: i32,
        reason: MatchEndReason,
    },
    Draw,
    Cheat {
        cheater: i32,
    },
    Cancel {
        reason: MatchEndReason,
    },
}

impl Ending {
    fn target(&self) -> MatchStatus {
        match self {
            Ending::Win { .. } | Ending::Draw => MatchStatus::Completed,
            Ending::Cheat { .. } => MatchStatus::Cheating,
            Ending::Cancel { .. } => MatchStatus::Cancelled,
        }
    }

    fn reason(&self) -> MatchEndReason {
        match self {
            Ending::Win { reason, .. } | Ending::Cancel { reason } => *reason,
            Ending::Draw => MatchEndReason::Draw,
            Ending::Cheat { .. } => MatchEndReason::AntiCheat,
        }
    }

    /// Columns for the winner and loser slots. A cheater is recorded as loser.
    fn sides(&self) -> (Option<i32>, Option<i32>) {
        match self {
            Ending::Win { winner, loser, .. } => (Some(*winner), Some(*loser)),
            Ending::Cheat { cheater } => (None, Some(*cheater)),
            Ending::Draw | Ending::Cancel { .. } => (None, None),
        }
    }
}

pub struct MatchCoordinator {
    db: DatabaseConnection,
    fanout: Arc<Fanout>,
    presence: Arc<PresenceTracker>,
    ledger: Arc<RatingLedger>,
    locks: KeyedLocks,
    stats: StatsConfig,
}

impl MatchCoordinator {
    pub fn new(
        db: DatabaseConnection,
        fanout: Arc<Fanout>,
        presence: Arc<PresenceTracker>,
        ledger: Arc<RatingLedger>,
        stats: StatsConfig,
    ) -> Self {
        Self {
            db,
            fanout,
            presence,
            ledger,
            locks: KeyedLocks::new(),
            stats,
        }
    }

    /// Insert a PENDING match. A random problem is drawn when none is given.
    #[instrument(skip(self))]
    pub async fn create_match(
        &self,
        player1_id: i32,
        player2_id: i32,
        problem_id: Option<i32>,
    ) -> Result<matches::Model, CoreError> {
        if player1_id == player2_id {
            return Err(CoreError::InvalidInput(
                "A player cannot duel themselves".into(),
            ));
        }
        store::profiles::get_user(&self.db, player1_id).await?;
        store::profiles::get_user(&self.db, player2_id).await?;

        let problem_id = match problem_id {
            Some(id) => store::problems::get_problem(&self.db, id).await?.id,
            None => store::problems::random_problem_id(&self.db)
                .await?
                .ok_or_else(|| CoreError::NotFound("No problems available".into()))?,
        };

        let duel =
            store::matches::insert_pending(&self.db, player1_id, player2_id, problem_id).await?;
        info!(match_id = duel.id, problem_id, "Match created");
        Ok(duel)
    }

    /// Register a participant's connection and activate the match once both are in.
    #[instrument(skip(self, username))]
    pub async fn player_joined(
        &self,
        match_id: i32,
        user_id: i32,
        username: &str,
    ) -> Result<JoinOutcome, CoreError> {
        let _guard = self.locks.lock(match_id).await;
        let duel = store::matches::get(&self.db, match_id).await?;
        if !duel.is_participant(user_id) {
            return Err(CoreError::InvalidInput(format!(
                "User {user_id} is not a participant of match {match_id}"
            )));
        }
        if duel.status.is_terminal() {
            return Ok(JoinOutcome::Ended(duel.status));
        }

        self.presence.join(match_id, user_id, username);

        match duel.status {
            MatchStatus::Pending if self.presence.both_present(match_id) => {
                match self.activate_locked(&duel).await? {
                    Some(payload) => Ok(JoinOutcome::Activated(payload)),
                    None => Ok(JoinOutcome::Waiting),
                }
            }
            MatchStatus::Active => {
                let start_time = duel.start_time.unwrap_or(duel.created_at);
                Ok(JoinOutcome::Rejoined(
                    self.start_payload(&duel, start_time).await?,
                ))
            }
            _ => Ok(JoinOutcome::Waiting),
        }
    }

    /// Unregister a connection. If only the opponent is left in an active
    /// match, the opponent wins by disconnect.
    #[instrument(skip(self, username))]
    pub async fn player_left(
        &self,
        match_id: i32,
        user_id: i32,
        username: &str,
    ) -> Result<Option<MatchEndPayload>, CoreError> {
        let guard = self.locks.lock(match_id).await;
        let remaining = self.presence.leave(match_id, user_id, username);
        if remaining != 1 || self.presence.is_present(match_id, user_id) {
            return Ok(None);
        }

        let Some(duel) = store::matches::find(&self.db, match_id).await? else {
            return Ok(None);
        };
        let Some(opponent) = duel.opponent_of(user_id) else {
            return Ok(None);
        };
        self.disconnect_locked(&duel, opponent, guard).await
    }

    /// PENDING -> ACTIVE. No-op on any other status.
    pub async fn activate(&self, match_id: i32) -> Result<Option<MatchStartPayload>, CoreError> {
        let _guard = self.locks.lock(match_id).await;
        let duel = store::matches::get(&self.db, match_id).await?;
        self.activate_locked(&duel).await
    }

    /// End an active match with a winner, or as a draw when `winner_id` is `None`.
    #[instrument(skip(self))]
    pub async fn finalize_normal(
        &self,
        match_id: i32,
        winner_id: Option<i32>,
        reason: MatchEndReason,
    ) -> Result<Option<MatchEndPayload>, CoreError> {
        let guard = self.locks.lock(match_id).await;
        let duel = store::matches::get(&self.db, match_id).await?;
        let ending = match winner_id {
            Some(winner) => {
                let loser = duel.opponent_of(winner).ok_or_else(|| {
                    CoreError::InvalidInput(format!(
                        "User {winner} is not a participant of match {match_id}"
                    ))
                })?;
                Ending::Win {
                    winner,
                    loser,
                    reason,
                }
            }
            None => Ending::Draw,
        };
        self.finish(&duel, ending, guard).await
    }

    /// ACTIVE -> CHEATING with a penalty for `cheater_id` only.
    #[instrument(skip(self))]
    pub async fn finalize_cheat(
        &self,
        match_id: i32,
        cheater_id: i32,
    ) -> Result<Option<MatchEndPayload>, CoreError> {
        let guard = self.locks.lock(match_id).await;
        let duel = store::matches::get(&self.db, match_id).await?;
        if !duel.is_participant(cheater_id) {
            return Err(CoreError::InvalidInput(format!(
                "User {cheater_id} is not a participant of match {match_id}"
            )));
        }
        self.finish(&duel, Ending::Cheat { cheater: cheater_id }, guard)
            .await
    }

    /// Award the match to `remaining_user_id` if they are the only one still connected.
    #[instrument(skip(self))]
    pub async fn finalize_disconnect(
        &self,
        match_id: i32,
        remaining_user_id: i32,
    ) -> Result<Option<MatchEndPayload>, CoreError> {
        let guard = self.locks.lock(match_id).await;
        let duel = store::matches::get(&self.db, match_id).await?;
        self.disconnect_locked(&duel, remaining_user_id, guard).await
    }

    /// PENDING or ACTIVE -> CANCELLED without rating changes.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        match_id: i32,
        reason: MatchEndReason,
    ) -> Result<Option<MatchEndPayload>, CoreError> {
        let guard = self.locks.lock(match_id).await;
        let duel = store::matches::get(&self.db, match_id).await?;
        self.finish(&duel, Ending::Cancel { reason }, guard).await
    }

    /// Cancel every PENDING match older than `ttl`. Returns how many were cancelled.
    pub async fn expire_stale_matches(&self, ttl: Duration) -> Result<usize, CoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CoreError::InvalidInput(format!("Invalid match TTL: {e}")))?;
        let stale = store::matches::stale_pending(&self.db, Utc::now() - ttl).await?;

        let mut expired = 0;
        for match_id in stale {
            if self
                .cancel(match_id, MatchEndReason::Expired)
                .await?
                .is_some()
            {
                expired += 1;
            }
        }
        if expired > 0 {
            info!(expired, "Expired stale pending matches");
        }
        Ok(expired)
    }

    /// Completion policy, run after a submission received its verdict.
    ///
    /// An accepted submission wins outright. Otherwise, once both players
    /// have a verdict, the latest verdicts are compared by passed cases.
    #[instrument(skip(self, judged), fields(submission_id = judged.id, match_id = judged.match_id))]
    pub async fn on_submission_judged(
        &self,
        judged: &submission::Model,
    ) -> Result<Option<MatchEndPayload>, CoreError> {
        let guard = self.locks.lock(judged.match_id).await;
        let Some(duel) = store::matches::find(&self.db, judged.match_id).await? else {
            warn!("Judged submission belongs to a missing match");
            return Ok(None);
        };
        if duel.status != MatchStatus::Active {
            debug!(status = %duel.status, "Match not active, verdict has no effect");
            return Ok(None);
        }

        if judged.status.is_accepted() {
            let Some(loser) = duel.opponent_of(judged.user_id) else {
                return Ok(None);
            };
            let ending = Ending::Win {
                winner: judged.user_id,
                loser,
                reason: MatchEndReason::Accepted,
            };
            return self.finish(&duel, ending, guard).await;
        }

        let [p1, p2] = duel.players();
        let latest1 = store::submissions::latest_terminal_for(&self.db, duel.id, p1).await?;
        let latest2 = store::submissions::latest_terminal_for(&self.db, duel.id, p2).await?;
        let (Some(s1), Some(s2)) = (latest1, latest2) else {
            return Ok(None);
        };

        let ending = match s1.test_cases_passed.cmp(&s2.test_cases_passed) {
            Ordering::Greater => Ending::Win {
                winner: p1,
                loser: p2,
                reason: MatchEndReason::MoreTestsPassed,
            },
            Ordering::Less => Ending::Win {
                winner: p2,
                loser: p1,
                reason: MatchEndReason::MoreTestsPassed,
            },
            Ordering::Equal => Ending::Draw,
        };
        self.finish(&duel, ending, guard).await
    }

    async fn activate_locked(
        &self,
        duel: &matches::Model,
    ) -> Result<Option<MatchStartPayload>, CoreError> {
        if duel.status != MatchStatus::Pending {
            return Ok(None);
        }
        let now = Utc::now();
        let changes = matches::ActiveModel {
            start_time: Set(Some(now)),
            ..Default::default()
        };
        if !store::matches::transition(
            &self.db,
            duel.id,
            MatchStatus::Pending,
            MatchStatus::Active,
            changes,
        )
        .await?
        {
            return Ok(None);
        }

        let payload = self.start_payload(duel, now).await?;
        self.fanout
            .publish_to_match(duel.id, ServerEvent::MatchStart(payload.clone()));
        info!(match_id = duel.id, "Match activated");
        Ok(Some(payload))
    }

    async fn disconnect_locked(
        &self,
        duel: &matches::Model,
        remaining: i32,
        guard: tokio::sync::OwnedMutexGuard<()>,
    ) -> Result<Option<MatchEndPayload>, CoreError> {
        if duel.status != MatchStatus::Active {
            return Ok(None);
        }
        let Some(leaver) = duel.opponent_of(remaining) else {
            return Ok(None);
        };
        if self.presence.present(duel.id) != [remaining] {
            return Ok(None);
        }
        let ending = Ending::Win {
            winner: remaining,
            loser: leaver,
            reason: MatchEndReason::Disconnect,
        };
        self.finish(duel, ending, guard).await
    }

    /// Move `duel` to its terminal status and settle ratings. The match lock
    /// must be held; it is released once the match channel is closed.
    async fn finish(
        &self,
        duel: &matches::Model,
        ending: Ending,
        guard: tokio::sync::OwnedMutexGuard<()>,
    ) -> Result<Option<MatchEndPayload>, CoreError> {
        let to = ending.target();
        if !duel.status.can_transition_to(to) {
            debug!(match_id = duel.id, from = %duel.status, %to, "Finalize skipped");
            return Ok(None);
        }

        let players = duel.players();
        let user_guards = self.ledger.lock_users(&players).await;
        let settled = self.settle(duel, ending).await;
        drop(user_guards);
        self.ledger.release_users(&players);

        let Some(outcomes) = settled? else {
            debug!(match_id = duel.id, "Match already finalized");
            return Ok(None);
        };

        let (winner_id, loser_id) = ending.sides();
        let payload = MatchEndPayload {
            match_id: duel.id,
            status: to,
            winner_id,
            loser_id,
            reason: ending.reason(),
            rating_changes: outcomes
                .iter()
                .map(|(user_id, o)| RatingChange {
                    user_id: *user_id,
                    old_rating: o.before.rating,
                    new_rating: o.after.rating,
                    rank: o.after.rank,
                })
                .collect(),
        };
        self.fanout
            .publish_to_match(duel.id, ServerEvent::MatchEnd(payload.clone()));

        for (user_id, _) in outcomes.iter().filter(|(_, o)| o.rating_changed()) {
            match store::profiles::user_update(&self.db, *user_id).await {
                Ok(update) => self.fanout.publish_global(ServerEvent::UserUpdate(update)),
                Err(e) => warn!(user_id, error = %e, "Skipping user update"),
            }
        }

        self.presence.clear(duel.id);
        self.fanout.close_match(duel.id);
        drop(guard);
        self.locks.release(duel.id);

        info!(
            match_id = duel.id,
            status = %to,
            reason = %payload.reason,
            winner_id = ?payload.winner_id,
            "Match finalized"
        );
        Ok(Some(payload))
    }

    /// Database half of [`MatchCoordinator::finish`]. `None` when the
    /// compare-and-set lost.
    async fn settle(
        &self,
        duel: &matches::Model,
        ending: Ending,
    ) -> Result<Option<Vec<(i32, RatingOutcome)>>, CoreError> {
        let (winner_id, loser_id) = ending.sides();
        let changes = matches::ActiveModel {
            winner_id: Set(winner_id),
            loser_id: Set(loser_id),
            end_reason: Set(Some(ending.reason())),
            end_time: Set(Some(Utc::now())),
            ..Default::default()
        };

        let txn = self.db.begin().await?;
        if !store::matches::transition(&txn, duel.id, duel.status, ending.target(), changes)
            .await?
        {
            txn.rollback().await?;
            return Ok(None);
        }

        let mut outcomes = Vec::with_capacity(2);
        match ending {
            Ending::Win { winner, loser, .. } => {
                let (won, lost) = self
                    .ledger
                    .apply_pair_in(&txn, winner, loser, rating::match_result)
                    .await?;
                store::profiles::increment_stats(&txn, winner, BattleOutcome::Win).await?;
                store::profiles::increment_stats(&txn, loser, BattleOutcome::Loss).await?;
                outcomes.push((winner, won));
                outcomes.push((loser, lost));
            }
            Ending::Draw => {
                if self.stats.draw_policy == DrawPolicy::CountBattle {
                    for user_id in duel.players() {
                        store::profiles::increment_stats(&txn, user_id, BattleOutcome::Draw)
                            .await?;
                    }
                }
            }
            Ending::Cheat { cheater } => {
                let penalty = self
                    .ledger
                    .apply_in(&txn, cheater, rating::cheat_penalty)
                    .await?;
                outcomes.push((cheater, penalty));
            }
            Ending::Cancel { .. } => {}
        }
        txn.commit().await?;
        Ok(Some(outcomes))
    }

    async fn start_payload(
        &self,
        duel: &matches::Model,
        start_time: DateTime<Utc>,
    ) -> Result<MatchStartPayload, CoreError> {
        let problem = store::problems::get_problem(&self.db, duel.problem_id).await?;
        let mut players = Vec::with_capacity(2);
        for user_id in duel.players() {
            let user = store::profiles::get_user(&self.db, user_id).await?;
            let profile = store::profiles::get_profile(&self.db, user_id).await?;
            players.push(PlayerSummary {
                user_id,
                username: user.username,
                rating: profile.rating,
                rank: profile.rank,
            });
        }
        Ok(MatchStartPayload {
            match_id: duel.id,
            problem: ProblemSummary {
                id: problem.id,
                title: problem.title,
                description: problem.description,
                difficulty: problem.difficulty,
                time_limit_ms: problem.time_limit_ms,
                memory_limit_mb: problem.memory_limit_mb,
            },
            players,
            start_time,
        })
    }
}

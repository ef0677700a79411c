use std::collections::HashMap;

use chrono::Utc;
use common::event::{PlayerSummary, UserUpdatePayload};
use sea_orm::*;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::config::RatingConfig;
use crate::entity::{user, user_profile};
use crate::error::CoreError;
use crate::rating::{Profile, RatingOutcome};
use crate::utils::locks::KeyedLocks;

/// Per-player result of a finished match, for statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattleOutcome {
    Win,
    Loss,
    Draw,
}

/// Serializes rating read-modify-write per user.
///
/// Take the user lock with [`RatingLedger::lock_users`] before opening the
/// transaction that calls [`RatingLedger::apply_in`]; [`RatingLedger::apply`]
/// does both for single updates.
pub struct RatingLedger {
    locks: KeyedLocks,
    config: RatingConfig,
}

impl RatingLedger {
    pub fn new(config: RatingConfig) -> Self {
        Self {
            locks: KeyedLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    pub async fn lock_users(&self, user_ids: &[i32]) -> Vec<OwnedMutexGuard<()>> {
        self.locks.lock_many(user_ids).await
    }

    pub fn release_users(&self, user_ids: &[i32]) {
        for id in user_ids {
            self.locks.release(*id);
        }
    }

    /// Insert a user and its rating record in one transaction.
    pub async fn create_user(
        &self,
        db: &DatabaseConnection,
        username: &str,
    ) -> Result<(user::Model, user_profile::Model), CoreError> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > 32 {
            return Err(CoreError::InvalidInput(
                "Username must be 1-32 characters".into(),
            ));
        }

        let txn = db.begin().await?;
        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .count(&txn)
            .await?
            > 0;
        if taken {
            txn.rollback().await?;
            return Err(CoreError::Conflict(format!(
                "Username '{username}' is already taken"
            )));
        }

        let now = Utc::now();
        let user = user::ActiveModel {
            username: Set(username.to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let initial = self.config.initial_profile();
        let profile = user_profile::ActiveModel {
            user_id: Set(user.id),
            rating: Set(initial.rating),
            rank: Set(initial.rank),
            is_online: Set(false),
            last_seen: Set(None),
            total_battles: Set(0),
            wins: Set(0),
            losses: Set(0),
            streak: Set(0),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok((user, profile))
    }

    /// Apply `change` to one user under that user's lock, in its own transaction.
    pub async fn apply<F>(
        &self,
        db: &DatabaseConnection,
        user_id: i32,
        change: F,
    ) -> Result<RatingOutcome, CoreError>
    where
        F: FnOnce(&RatingConfig, Profile) -> RatingOutcome,
    {
        let guard = self.locks.lock(user_id).await;
        let txn = db.begin().await?;
        let outcome = self.apply_in(&txn, user_id, change).await?;
        txn.commit().await?;
        drop(guard);
        self.locks.release(user_id);
        Ok(outcome)
    }

    /// Same as [`RatingLedger::apply`] for a caller already holding the user
    /// lock and an open transaction.
    pub async fn apply_in<C, F>(
        &self,
        conn: &C,
        user_id: i32,
        change: F,
    ) -> Result<RatingOutcome, CoreError>
    where
        C: ConnectionTrait,
        F: FnOnce(&RatingConfig, Profile) -> RatingOutcome,
    {
        let current = load_rating(conn, user_id).await?;
        let outcome = change(&self.config, current);
        self.store(conn, user_id, &outcome).await?;
        Ok(outcome)
    }

    /// Settle a decided match: both records are read, then `change` sees
    /// them together. Caller holds both user locks and the transaction.
    pub async fn apply_pair_in<C, F>(
        &self,
        conn: &C,
        winner_id: i32,
        loser_id: i32,
        change: F,
    ) -> Result<(RatingOutcome, RatingOutcome), CoreError>
    where
        C: ConnectionTrait,
        F: FnOnce(&RatingConfig, Profile, Profile) -> (RatingOutcome, RatingOutcome),
    {
        let winner = load_rating(conn, winner_id).await?;
        let loser = load_rating(conn, loser_id).await?;
        let (won, lost) = change(&self.config, winner, loser);
        self.store(conn, winner_id, &won).await?;
        self.store(conn, loser_id, &lost).await?;
        Ok((won, lost))
    }

    async fn store<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i32,
        outcome: &RatingOutcome,
    ) -> Result<(), CoreError> {
        set_profile(conn, user_id, outcome).await?;
        debug!(
            user_id,
            old_rating = outcome.before.rating,
            new_rating = outcome.after.rating,
            "Rating updated"
        );
        Ok(())
    }
}

async fn load_rating<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<Profile, CoreError> {
    let current = get_profile(conn, user_id).await?;
    Ok(Profile {
        rating: current.rating,
        rank: current.rank,
    })
}

pub async fn get_profile<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<user_profile::Model, CoreError> {
    user_profile::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("User {user_id} not found")))
}

pub async fn get_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model, CoreError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("User {user_id} not found")))
}

/// Persist a computed outcome. The rank column is written only when it moved.
pub async fn set_profile<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    outcome: &RatingOutcome,
) -> Result<(), DbErr> {
    let mut update = user_profile::ActiveModel {
        rating: Set(outcome.after.rating),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if outcome.rank_changed() {
        update.rank = Set(outcome.after.rank);
    }
    user_profile::Entity::update_many()
        .set(update)
        .filter(user_profile::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Bump battle counters. A win extends the streak, anything else resets it.
pub async fn increment_stats<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    outcome: BattleOutcome,
) -> Result<(), CoreError> {
    let current = get_profile(db, user_id).await?;
    let (wins, losses, streak) = match outcome {
        BattleOutcome::Win => (current.wins + 1, current.losses, current.streak + 1),
        BattleOutcome::Loss => (current.wins, current.losses + 1, 0),
        BattleOutcome::Draw => (current.wins, current.losses, 0),
    };
    user_profile::Entity::update_many()
        .set(user_profile::ActiveModel {
            total_battles: Set(current.total_battles + 1),
            wins: Set(wins),
            losses: Set(losses),
            streak: Set(streak),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(user_profile::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn set_online<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    online: bool,
) -> Result<(), DbErr> {
    let now = Utc::now();
    user_profile::Entity::update_many()
        .set(user_profile::ActiveModel {
            is_online: Set(online),
            last_seen: Set(Some(now)),
            ..Default::default()
        })
        .filter(user_profile::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Current dashboard card of a user.
pub async fn user_update<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<UserUpdatePayload, CoreError> {
    let user = get_user(db, user_id).await?;
    let profile = get_profile(db, user_id).await?;
    Ok(UserUpdatePayload {
        user_id,
        username: user.username,
        rating: profile.rating,
        rank: profile.rank,
        is_online: profile.is_online,
    })
}

/// Up to `limit` online players other than `user_id`, closest rating first.
/// Ties go to the lower user id.
pub async fn online_near<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    limit: usize,
) -> Result<Vec<PlayerSummary>, CoreError> {
    let me = get_profile(db, user_id).await?;
    let mut online = user_profile::Entity::find()
        .filter(user_profile::Column::IsOnline.eq(true))
        .filter(user_profile::Column::UserId.ne(user_id))
        .all(db)
        .await?;
    online.sort_by_key(|p| ((p.rating - me.rating).abs(), p.user_id));
    online.truncate(limit);

    let names: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(online.iter().map(|p| p.user_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    Ok(online
        .into_iter()
        .filter_map(|p| {
            names.get(&p.user_id).map(|username| PlayerSummary {
                user_id: p.user_id,
                username: username.clone(),
                rating: p.rating,
                rank: p.rank,
            })
        })
        .collect())
}

/// Percentage of battles won, 0 when none were played.
pub fn win_rate(wins: i32, total_battles: i32) -> f64 {
    if total_battles <= 0 {
        0.0
    } else {
        wins as f64 * 100.0 / total_battles as f64
    }
}

use chrono::{DateTime, Utc};
use common::MatchStatus;
use sea_orm::*;

use crate::entity::matches;
use crate::error::CoreError;

pub async fn find<C: ConnectionTrait>(db: &C, match_id: i32) -> Result<Option<matches::Model>, DbErr> {
    matches::Entity::find_by_id(match_id).one(db).await
}

pub async fn get<C: ConnectionTrait>(db: &C, match_id: i32) -> Result<matches::Model, CoreError> {
    find(db, match_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Match {match_id} not found")))
}

pub async fn insert_pending<C: ConnectionTrait>(
    db: &C,
    player1_id: i32,
    player2_id: i32,
    problem_id: i32,
) -> Result<matches::Model, DbErr> {
    matches::ActiveModel {
        player1_id: Set(player1_id),
        player2_id: Set(player2_id),
        problem_id: Set(problem_id),
        status: Set(MatchStatus::Pending),
        winner_id: Set(None),
        loser_id: Set(None),
        end_reason: Set(None),
        created_at: Set(Utc::now()),
        start_time: Set(None),
        end_time: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Compare-and-set status change. Writes `changes` plus the new status only
/// if the row is still in `from`; returns whether the row was updated.
pub async fn transition<C: ConnectionTrait>(
    db: &C,
    match_id: i32,
    from: MatchStatus,
    to: MatchStatus,
    mut changes: matches::ActiveModel,
) -> Result<bool, CoreError> {
    if !from.can_transition_to(to) {
        return Err(CoreError::Conflict(format!(
            "Match cannot move from {from} to {to}"
        )));
    }
    changes.status = Set(to);

    let res = matches::Entity::update_many()
        .set(changes)
        .filter(matches::Column::Id.eq(match_id))
        .filter(matches::Column::Status.eq(from))
        .exec(db)
        .await?;
    Ok(res.rows_affected == 1)
}

/// PENDING matches created before `cutoff`.
pub async fn stale_pending<C: ConnectionTrait>(
    db: &C,
    cutoff: DateTime<Utc>,
) -> Result<Vec<i32>, DbErr> {
    matches::Entity::find()
        .select_only()
        .column(matches::Column::Id)
        .filter(matches::Column::Status.eq(MatchStatus::Pending))
        .filter(matches::Column::CreatedAt.lt(cutoff))
        .into_tuple()
        .all(db)
        .await
}

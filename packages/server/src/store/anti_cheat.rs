use std::collections::HashMap;

use chrono::Utc;
use common::ViolationKind;
use sea_orm::*;

use crate::entity::anti_cheat_log;

pub async fn append<C: ConnectionTrait>(
    db: &C,
    match_id: i32,
    user_id: i32,
    kind: ViolationKind,
    details: Option<String>,
) -> Result<anti_cheat_log::Model, DbErr> {
    anti_cheat_log::ActiveModel {
        user_id: Set(user_id),
        match_id: Set(match_id),
        kind: Set(kind),
        details: Set(details),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Log entries per kind for one player in one match. Every kind is present.
pub async fn counts_by_kind<C: ConnectionTrait>(
    db: &C,
    match_id: i32,
    user_id: i32,
) -> Result<HashMap<ViolationKind, u64>, DbErr> {
    let mut counts = HashMap::with_capacity(ViolationKind::ALL.len());
    for kind in ViolationKind::ALL {
        let count = anti_cheat_log::Entity::find()
            .filter(anti_cheat_log::Column::MatchId.eq(match_id))
            .filter(anti_cheat_log::Column::UserId.eq(user_id))
            .filter(anti_cheat_log::Column::Kind.eq(kind))
            .count(db)
            .await?;
        counts.insert(kind, count);
    }
    Ok(counts)
}

use rand::seq::IndexedRandom;
use sea_orm::*;

use crate::entity::{problem, test_case};
use crate::error::CoreError;

pub async fn get_problem<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
) -> Result<problem::Model, CoreError> {
    problem::Entity::find_by_id(problem_id)
        .one(db)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Problem {problem_id} not found")))
}

/// Test cases in judging order.
pub async fn get_test_cases<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
) -> Result<Vec<test_case::Model>, DbErr> {
    test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(problem_id))
        .order_by_asc(test_case::Column::Position)
        .order_by_asc(test_case::Column::Id)
        .all(db)
        .await
}

/// `None` when the problem table is empty.
pub async fn random_problem_id<C: ConnectionTrait>(db: &C) -> Result<Option<i32>, DbErr> {
    let ids: Vec<i32> = problem::Entity::find()
        .select_only()
        .column(problem::Column::Id)
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.choose(&mut rand::rng()).copied())
}

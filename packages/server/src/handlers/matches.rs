use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::MatchEndReason;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::duel::*;
use crate::state::AppState;
use crate::store;

#[utoipa::path(
    post,
    path = "/matches",
    tag = "Matches",
    operation_id = "createMatch",
    summary = "Challenge another player",
    description = "Creates a PENDING match between the caller and `opponent_id`. The match starts once both players connect to its WebSocket.",
    request_body = CreateMatchRequest,
    responses(
        (status = 201, description = "Match created", body = MatchResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (TOKEN_MISSING)", body = ErrorBody),
        (status = 404, description = "Unknown player or problem (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, payload), fields(caller = auth_user.user_id))]
pub async fn create_match(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateMatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let duel = state
        .coordinator
        .create_match(auth_user.user_id, payload.opponent_id, payload.problem_id)
        .await?;
    Ok((StatusCode::CREATED, Json(MatchResponse::from(duel))))
}

#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "Matches",
    operation_id = "getMatch",
    summary = "Get a match",
    params(("id" = i32, Path, description = "Match ID")),
    responses(
        (status = 200, description = "Match", body = MatchResponse),
        (status = 404, description = "Unknown match (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MatchResponse>, AppError> {
    let duel = store::matches::get(&state.db, id).await?;
    Ok(Json(duel.into()))
}

#[utoipa::path(
    post,
    path = "/matches/{id}/cancel",
    tag = "Matches",
    operation_id = "cancelMatch",
    summary = "Cancel a match",
    description = "Moves a PENDING or ACTIVE match to CANCELLED without rating changes. Only participants may cancel.",
    params(("id" = i32, Path, description = "Match ID")),
    responses(
        (status = 200, description = "Match cancelled", body = MatchResponse),
        (status = 401, description = "Missing caller identity (TOKEN_MISSING)", body = ErrorBody),
        (status = 403, description = "Not a participant (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Unknown match (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Match already over (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(caller = auth_user.user_id))]
pub async fn cancel_match(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MatchResponse>, AppError> {
    let duel = store::matches::get(&state.db, id).await?;
    if !duel.is_participant(auth_user.user_id) {
        return Err(AppError::PermissionDenied);
    }

    let cancelled = state
        .coordinator
        .cancel(id, MatchEndReason::Cancelled)
        .await?
        .is_some();

    let duel = store::matches::get(&state.db, id).await?;
    if !cancelled {
        return Err(AppError::Conflict(format!(
            "Match {id} is already {}",
            duel.status
        )));
    }
    Ok(Json(duel.into()))
}

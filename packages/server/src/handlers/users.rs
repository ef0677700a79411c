use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::user::*;
use crate::state::AppState;
use crate::store;

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    operation_id = "createUser",
    summary = "Register a player",
    description = "Creates the user together with its rating profile at the initial rating.",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Username taken (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, profile) = state
        .ledger
        .create_user(&state.db, &payload.username)
        .await?;
    Ok((StatusCode::CREATED, Json(ProfileResponse::new(user, profile))))
}

#[utoipa::path(
    get,
    path = "/users/{id}/profile",
    tag = "Users",
    operation_id = "getProfile",
    summary = "Get a player's rating profile",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "Unknown user (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = store::profiles::get_user(&state.db, id).await?;
    let profile = store::profiles::get_profile(&state.db, id).await?;
    Ok(Json(ProfileResponse::new(user, profile)))
}

#[utoipa::path(
    get,
    path = "/users/online",
    tag = "Users",
    operation_id = "listOnlinePlayers",
    summary = "Online players closest to the caller's rating",
    description = "At most 10 players, the caller excluded, nearest rating first.",
    responses(
        (status = 200, description = "Online players", body = Vec<OnlinePlayerResponse>),
        (status = 401, description = "Missing caller identity (TOKEN_MISSING)", body = ErrorBody),
        (status = 404, description = "Unknown caller (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(caller = auth_user.user_id))]
pub async fn list_online_players(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<OnlinePlayerResponse>>, AppError> {
    let players = state.lobby.nearest_players(auth_user.user_id).await?;
    Ok(Json(players.into_iter().map(Into::into).collect()))
}

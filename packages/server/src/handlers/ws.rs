//! WebSocket endpoints: one socket per player per match, plus the dashboard lobby.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use common::MatchStatus;
use common::event::{
    ClientAction, DashboardAction, PlayerListPayload, PlayerRef, ServerEvent,
    SubmissionPendingPayload,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::coordinator::JoinOutcome;
use crate::error::AppError;
use crate::state::AppState;
use crate::store;

/// Identity of a socket, set by the upstream gateway.
#[derive(Deserialize)]
pub struct WsIdentity {
    pub user_id: Option<i32>,
}

/// `GET /ws/matches/{id}?user_id=...`. Participants only.
pub async fn match_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(match_id): Path<i32>,
    Query(identity): Query<WsIdentity>,
) -> Result<Response, AppError> {
    let user_id = identity.user_id.ok_or(AppError::TokenMissing)?;
    let duel = store::matches::get(&state.db, match_id).await?;
    if !duel.is_participant(user_id) {
        return Err(AppError::PermissionDenied);
    }
    if duel.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Match {match_id} is already {}",
            duel.status
        )));
    }
    let user = store::profiles::get_user(&state.db, user_id).await?;

    Ok(ws.on_upgrade(move |socket| {
        handle_match_socket(socket, state, match_id, user.id, user.username)
    }))
}

/// `GET /ws/dashboard[?user_id=...]`. Receives `user_update` events for every
/// player. With an identity the socket also counts as presence and carries the
/// challenge handshake; without one it is a read-only feed.
pub async fn dashboard_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(identity): Query<WsIdentity>,
) -> Result<Response, AppError> {
    let viewer = match identity.user_id {
        Some(user_id) => {
            let user = store::profiles::get_user(&state.db, user_id).await?;
            Some(PlayerRef {
                user_id: user.id,
                username: user.username,
            })
        }
        None => None,
    };
    Ok(ws.on_upgrade(move |socket| handle_dashboard_socket(socket, state, viewer)))
}

async fn handle_match_socket(
    socket: WebSocket,
    state: AppState,
    match_id: i32,
    user_id: i32,
    username: String,
) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before joining so this socket sees the match.start it triggers.
    let mut events = state.fanout.subscribe_match(match_id);
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;
                direct = direct_rx.recv() => match direct {
                    Some(event) => event,
                    None => break,
                },
                shared = events.recv() => match shared {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(match_id, skipped, "Match socket lagging, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if !send_event(&mut sender, &event).await {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    if let Err(e) = state.lobby.connected(user_id).await {
        warn!(user_id, error = %e, "Failed to mark user online");
    }

    match state
        .coordinator
        .player_joined(match_id, user_id, &username)
        .await
    {
        Ok(JoinOutcome::Rejoined(snapshot)) => {
            let _ = direct_tx.send(ServerEvent::MatchStart(snapshot));
        }
        Ok(JoinOutcome::Ended(status)) => {
            let _ = direct_tx.send(ServerEvent::error(format!("Match is already {status}")));
            drop(direct_tx);
            state.fanout.close_match(match_id);
            let _ = send_task.await;
            if let Err(e) = state.lobby.disconnected(user_id).await {
                warn!(user_id, error = %e, "Failed to mark user offline");
            }
            return;
        }
        Ok(JoinOutcome::Waiting) | Ok(JoinOutcome::Activated(_)) => {}
        Err(e) => {
            error!(match_id, user_id, error = %e, "Failed to join match");
            let _ = direct_tx.send(ServerEvent::error("Failed to join match"));
        }
    }
    info!(match_id, user_id, "Player connected");

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                handle_client_message(&state, match_id, user_id, text.as_str(), &direct_tx).await
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    info!(match_id, user_id, "Player disconnected");

    if let Err(e) = state
        .coordinator
        .player_left(match_id, user_id, &username)
        .await
    {
        error!(match_id, user_id, error = %e, "Failed to handle player leaving");
    }
    if let Err(e) = state.lobby.disconnected(user_id).await {
        warn!(user_id, error = %e, "Failed to mark user offline");
    }
}

async fn handle_dashboard_socket(socket: WebSocket, state: AppState, viewer: Option<PlayerRef>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.fanout.subscribe_global();
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;
                direct = direct_rx.recv() => match direct {
                    Some(event) => event,
                    None => break,
                },
                shared = events.recv() => match shared {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Dashboard socket lagging");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if !send_event(&mut sender, &event).await {
                break;
            }
        }
    });

    let inbox = viewer.as_ref().map(|viewer| {
        state
            .fanout
            .register_inbox(viewer.user_id, direct_tx.clone())
    });
    if let Some(viewer) = &viewer {
        if let Err(e) = state.lobby.connected(viewer.user_id).await {
            warn!(user_id = viewer.user_id, error = %e, "Failed to mark user online");
        }
        match state.lobby.nearest_players(viewer.user_id).await {
            Ok(players) => {
                let _ = direct_tx.send(ServerEvent::PlayerList(PlayerListPayload { players }));
            }
            Err(e) => warn!(user_id = viewer.user_id, error = %e, "Failed to list online players"),
        }
        info!(user_id = viewer.user_id, "Dashboard connected");
    }

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match &viewer {
                Some(viewer) => {
                    handle_dashboard_message(&state, viewer, text.as_str(), &direct_tx).await
                }
                None => {
                    let _ = direct_tx.send(ServerEvent::error("Missing caller identity"));
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    send_task.abort();

    if let (Some(viewer), Some(inbox)) = (&viewer, inbox) {
        state.fanout.unregister_inbox(viewer.user_id, inbox);
        if !state.fanout.is_reachable(viewer.user_id) {
            state.lobby.forget(viewer);
        }
        if let Err(e) = state.lobby.disconnected(viewer.user_id).await {
            warn!(user_id = viewer.user_id, error = %e, "Failed to mark user offline");
        }
        info!(user_id = viewer.user_id, "Dashboard disconnected");
    }
}

async fn handle_dashboard_message(
    state: &AppState,
    viewer: &PlayerRef,
    text: &str,
    direct: &mpsc::UnboundedSender<ServerEvent>,
) {
    let action = match DashboardAction::parse(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(user_id = viewer.user_id, error = %e, "Rejected dashboard message");
            let _ = direct.send(ServerEvent::error(e.to_string()));
            return;
        }
    };

    let result = match action {
        DashboardAction::SendChallenge { target_user_id } => {
            state.lobby.send_challenge(viewer, target_user_id)
        }
        DashboardAction::CancelChallenge { target_user_id } => {
            state.lobby.cancel_challenge(viewer, target_user_id)
        }
        DashboardAction::ChallengeResponse {
            challenger_id,
            response,
        } => state
            .lobby
            .respond(viewer, challenger_id, response)
            .await
            .map(|_| ()),
    };
    if let Err(e) = result {
        let _ = direct.send(ServerEvent::error(e.to_string()));
    }
}

/// Returns false once the socket is gone.
async fn send_event<S>(sender: &mut S, event: &ServerEvent) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize event");
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

async fn handle_client_message(
    state: &AppState,
    match_id: i32,
    user_id: i32,
    text: &str,
    direct: &mpsc::UnboundedSender<ServerEvent>,
) {
    let action = match ClientAction::parse(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(match_id, user_id, error = %e, "Rejected client message");
            let _ = direct.send(ServerEvent::error(e.to_string()));
            return;
        }
    };

    match action {
        ClientAction::SubmitCode { code, language } => {
            if let Err(message) = submit_code(state, match_id, user_id, &code, &language).await {
                let _ = direct.send(ServerEvent::error(message));
            }
        }
    }
}

/// Validate and queue a submission. The `Err` text goes back to the submitter.
async fn submit_code(
    state: &AppState,
    match_id: i32,
    user_id: i32,
    code: &str,
    language: &str,
) -> Result<(), String> {
    if !state.pipeline.execution().supports(language) {
        return Err(format!("Unsupported language: {language}"));
    }

    let duel = match store::matches::find(&state.db, match_id).await {
        Ok(Some(duel)) => duel,
        Ok(None) => return Err(format!("Match {match_id} not found")),
        Err(e) => {
            error!(match_id, error = %e, "Failed to load match");
            return Err("Failed to submit code".into());
        }
    };
    if duel.status != MatchStatus::Active {
        return Err("Match is not active".into());
    }

    let submission = store::submissions::create(
        &state.db,
        match_id,
        user_id,
        duel.problem_id,
        language,
        code,
    )
    .await
    .map_err(|e| {
        error!(match_id, user_id, error = %e, "Failed to create submission");
        "Failed to submit code".to_string()
    })?;

    info!(match_id, user_id, submission_id = submission.id, %language, "Submission received");
    state.fanout.publish_to_match(
        match_id,
        ServerEvent::SubmissionPending(SubmissionPendingPayload {
            submission_id: submission.id,
            user_id,
        }),
    );

    if let Err(e) = state.judge_queue.enqueue(submission.id).await {
        error!(submission_id = submission.id, error = %e, "Failed to queue submission");
        state
            .pipeline
            .fail_submission(submission.id, "Judge queue unavailable")
            .await;
    }
    Ok(())
}

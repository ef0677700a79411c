//! Real-time event envelope shared by the server and its clients.
//!
//! Every server-to-client message is serialized as `{"type": ..., "payload": ...}`.
//! Client-to-server messages are `{"action": ..., ...}`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::{MatchEndReason, MatchStatus, Rank, SubmissionStatus};

/// Discriminant of a [`ServerEvent`], used for routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    MatchStart,
    SubmissionPending,
    SubmissionUpdate,
    MatchEnd,
    PlayerEvent,
    UserUpdate,
    PlayerList,
    ChallengeReceived,
    ChallengeCancelled,
    ChallengeResponse,
    MatchStartCountdown,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        Self::MatchStart,
        Self::SubmissionPending,
        Self::SubmissionUpdate,
        Self::MatchEnd,
        Self::PlayerEvent,
        Self::UserUpdate,
        Self::PlayerList,
        Self::ChallengeReceived,
        Self::ChallengeCancelled,
        Self::ChallengeResponse,
        Self::MatchStartCountdown,
        Self::Error,
    ];

    /// Wire name used in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MatchStart => "match.start",
            Self::SubmissionPending => "submission.pending",
            Self::SubmissionUpdate => "submission_update",
            Self::MatchEnd => "match_end",
            Self::PlayerEvent => "player.event",
            Self::UserUpdate => "user_update",
            Self::PlayerList => "player_list",
            Self::ChallengeReceived => "receive_challenge",
            Self::ChallengeCancelled => "challenge_cancelled",
            Self::ChallengeResponse => "challenge_response",
            Self::MatchStartCountdown => "match_start_countdown",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProblemSummary {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub difficulty: i32,
    pub time_limit_ms: i32,
    pub memory_limit_mb: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlayerSummary {
    pub user_id: i32,
    pub username: String,
    pub rating: i32,
    pub rank: Rank,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MatchStartPayload {
    pub match_id: i32,
    pub problem: ProblemSummary,
    pub players: Vec<PlayerSummary>,
    pub start_time: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubmissionPendingPayload {
    pub submission_id: i32,
    pub user_id: i32,
}

/// Published once a submission reaches a terminal status.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubmissionUpdatePayload {
    pub submission_id: i32,
    pub user_id: i32,
    pub status: SubmissionStatus,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub average_time_ms: f64,
    pub average_memory_kb: f64,
    pub error_message: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RatingChange {
    pub user_id: i32,
    pub old_rating: i32,
    pub new_rating: i32,
    pub rank: Rank,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MatchEndPayload {
    pub match_id: i32,
    pub status: MatchStatus,
    /// `None` for draws, cheating and cancellations.
    pub winner_id: Option<i32>,
    pub loser_id: Option<i32>,
    pub reason: MatchEndReason,
    pub rating_changes: Vec<RatingChange>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresenceChange {
    Joined,
    Left,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlayerEventPayload {
    pub event: PresenceChange,
    pub user_id: i32,
    pub username: String,
}

/// Rating or presence change of one player, for dashboards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserUpdatePayload {
    pub user_id: i32,
    pub username: String,
    pub rating: i32,
    pub rank: Rank,
    pub is_online: bool,
}

/// Online players nearest in rating, sent when a dashboard connects.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlayerListPayload {
    pub players: Vec<PlayerSummary>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlayerRef {
    pub user_id: i32,
    pub username: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChallengeReceivedPayload {
    pub challenger: PlayerRef,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChallengeCancelledPayload {
    pub challenger: PlayerRef,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeReply {
    Accepted,
    Declined,
}

/// Sent to the challenger when the target declines.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChallengeResponsePayload {
    pub response: ChallengeReply,
    pub responder: PlayerRef,
}

/// Sent to both players once an accepted challenge produced a match.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MatchStartCountdownPayload {
    pub match_id: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorPayload {
    pub message: String,
}

/// A message pushed from the server to connected clients.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "match.start")]
    MatchStart(MatchStartPayload),
    #[serde(rename = "submission.pending")]
    SubmissionPending(SubmissionPendingPayload),
    #[serde(rename = "submission_update")]
    SubmissionUpdate(SubmissionUpdatePayload),
    #[serde(rename = "match_end")]
    MatchEnd(MatchEndPayload),
    #[serde(rename = "player.event")]
    PlayerEvent(PlayerEventPayload),
    #[serde(rename = "user_update")]
    UserUpdate(UserUpdatePayload),
    #[serde(rename = "player_list")]
    PlayerList(PlayerListPayload),
    #[serde(rename = "receive_challenge")]
    ChallengeReceived(ChallengeReceivedPayload),
    #[serde(rename = "challenge_cancelled")]
    ChallengeCancelled(ChallengeCancelledPayload),
    #[serde(rename = "challenge_response")]
    ChallengeResponse(ChallengeResponsePayload),
    #[serde(rename = "match_start_countdown")]
    MatchStartCountdown(MatchStartCountdownPayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MatchStart(_) => EventKind::MatchStart,
            Self::SubmissionPending(_) => EventKind::SubmissionPending,
            Self::SubmissionUpdate(_) => EventKind::SubmissionUpdate,
            Self::MatchEnd(_) => EventKind::MatchEnd,
            Self::PlayerEvent(_) => EventKind::PlayerEvent,
            Self::UserUpdate(_) => EventKind::UserUpdate,
            Self::PlayerList(_) => EventKind::PlayerList,
            Self::ChallengeReceived(_) => EventKind::ChallengeReceived,
            Self::ChallengeCancelled(_) => EventKind::ChallengeCancelled,
            Self::ChallengeResponse(_) => EventKind::ChallengeResponse,
            Self::MatchStartCountdown(_) => EventKind::MatchStartCountdown,
            Self::Error(_) => EventKind::Error,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }
}

/// A message sent by a player over the match socket.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    SubmitCode {
        #[serde(default)]
        code: String,
        #[serde(default)]
        language: String,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ClientActionError {
    #[error("Unsupported action: {0}")]
    Unsupported(String),
    #[error("Missing action")]
    MissingAction,
    #[error("Malformed message: {0}")]
    Malformed(String),
    #[error("Missing code or language")]
    MissingField,
}

impl ClientAction {
    /// Parse and validate a raw text frame.
    pub fn parse(text: &str) -> Result<Self, ClientActionError> {
        let parsed: ClientAction = parse_action(text)?;
        let ClientAction::SubmitCode { code, language } = &parsed;
        if code.trim().is_empty() || language.trim().is_empty() {
            return Err(ClientActionError::MissingField);
        }
        Ok(parsed)
    }
}

/// A message sent by a signed-in player over the dashboard socket.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DashboardAction {
    SendChallenge {
        target_user_id: i32,
    },
    CancelChallenge {
        target_user_id: i32,
    },
    ChallengeResponse {
        challenger_id: i32,
        response: ChallengeReply,
    },
}

impl DashboardAction {
    pub fn parse(text: &str) -> Result<Self, ClientActionError> {
        parse_action(text)
    }
}

/// Decode an `{"action": ...}` frame, telling an unknown action apart from a
/// known one with bad fields.
fn parse_action<T: DeserializeOwned>(text: &str) -> Result<T, ClientActionError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ClientActionError::Malformed(e.to_string()))?;
    let action = value
        .get("action")
        .and_then(|a| a.as_str())
        .ok_or(ClientActionError::MissingAction)?
        .to_owned();

    serde_json::from_value(value).map_err(|e| {
        let message = e.to_string();
        if message.starts_with(&format!("unknown variant `{action}`")) {
            ClientActionError::Unsupported(action)
        } else {
            ClientActionError::Malformed(message)
        }
    })
}

//! The dashboard side of the arena: who is online, and the challenge
//! handshake that turns two consenting players into a match.

use std::sync::Arc;

use common::event::{
    ChallengeCancelledPayload, ChallengeReceivedPayload, ChallengeReply, ChallengeResponsePayload,
    MatchStartCountdownPayload, PlayerRef, PlayerSummary, ServerEvent,
};
use dashmap::{DashMap, DashSet};
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::{info, warn};

use crate::coordinator::MatchCoordinator;
use crate::error::CoreError;
use crate::fanout::Fanout;
use crate::store;
use crate::utils::locks::KeyedLocks;

/// How many players a dashboard is offered.
pub const NEAREST_PLAYERS: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ChallengeError {
    #[error("You cannot challenge yourself")]
    SelfChallenge,
    #[error("User {0} is not on the dashboard")]
    NotReachable(i32),
    #[error("No pending challenge to user {0}")]
    NoOutgoing(i32),
    #[error("No pending challenge from user {0}")]
    NoIncoming(i32),
}

pub struct Lobby {
    db: DatabaseConnection,
    fanout: Arc<Fanout>,
    coordinator: Arc<MatchCoordinator>,
    /// Open sockets per user, match and dashboard alike.
    connections: DashMap<i32, usize>,
    locks: KeyedLocks,
    /// (challenger, target)
    challenges: DashSet<(i32, i32)>,
}

impl Lobby {
    pub fn new(
        db: DatabaseConnection,
        fanout: Arc<Fanout>,
        coordinator: Arc<MatchCoordinator>,
    ) -> Self {
        Self {
            db,
            fanout,
            coordinator,
            connections: DashMap::new(),
            locks: KeyedLocks::new(),
            challenges: DashSet::new(),
        }
    }

    /// Count a new socket. The first one marks the user online and tells every dashboard.
    pub async fn connected(&self, user_id: i32) -> Result<(), CoreError> {
        let guard = self.locks.lock(user_id).await;
        let first = {
            let mut count = self.connections.entry(user_id).or_insert(0);
            *count += 1;
            *count == 1
        };
        let result = if first {
            self.set_presence(user_id, true).await
        } else {
            Ok(())
        };
        drop(guard);
        self.locks.release(user_id);
        result
    }

    /// Count a closed socket. The last one marks the user offline.
    pub async fn disconnected(&self, user_id: i32) -> Result<(), CoreError> {
        let guard = self.locks.lock(user_id).await;
        let last = match self.connections.get_mut(&user_id) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => false,
        };
        let result = if last {
            self.connections.remove_if(&user_id, |_, count| *count == 0);
            self.set_presence(user_id, false).await
        } else {
            Ok(())
        };
        drop(guard);
        self.locks.release(user_id);
        result
    }

    async fn set_presence(&self, user_id: i32, online: bool) -> Result<(), CoreError> {
        store::profiles::set_online(&self.db, user_id, online).await?;
        let update = store::profiles::user_update(&self.db, user_id).await?;
        self.fanout.publish_global(ServerEvent::UserUpdate(update));
        info!(user_id, online, "Presence changed");
        Ok(())
    }

    pub async fn nearest_players(&self, user_id: i32) -> Result<Vec<PlayerSummary>, CoreError> {
        store::profiles::online_near(&self.db, user_id, NEAREST_PLAYERS).await
    }

    /// Offer a duel. The target must have a dashboard open. Re-sending refreshes the offer.
    pub fn send_challenge(
        &self,
        challenger: &PlayerRef,
        target_id: i32,
    ) -> Result<(), ChallengeError> {
        if challenger.user_id == target_id {
            return Err(ChallengeError::SelfChallenge);
        }
        if !self.fanout.is_reachable(target_id) {
            return Err(ChallengeError::NotReachable(target_id));
        }
        self.challenges.insert((challenger.user_id, target_id));
        info!(challenger_id = challenger.user_id, target_id, "Challenge sent");
        self.fanout.publish_to_user(
            target_id,
            ServerEvent::ChallengeReceived(ChallengeReceivedPayload {
                challenger: challenger.clone(),
            }),
        );
        Ok(())
    }

    pub fn cancel_challenge(
        &self,
        challenger: &PlayerRef,
        target_id: i32,
    ) -> Result<(), ChallengeError> {
        if self
            .challenges
            .remove(&(challenger.user_id, target_id))
            .is_none()
        {
            return Err(ChallengeError::NoOutgoing(target_id));
        }
        self.notify_cancelled(challenger, target_id);
        Ok(())
    }

    /// Answer a pending challenge. On acceptance the match is created and
    /// both players get a countdown; returns the new match id.
    pub async fn respond(
        &self,
        responder: &PlayerRef,
        challenger_id: i32,
        reply: ChallengeReply,
    ) -> Result<Option<i32>, ChallengeError> {
        if self
            .challenges
            .remove(&(challenger_id, responder.user_id))
            .is_none()
        {
            return Err(ChallengeError::NoIncoming(challenger_id));
        }

        match reply {
            ChallengeReply::Declined => {
                info!(challenger_id, responder_id = responder.user_id, "Challenge declined");
                self.fanout.publish_to_user(
                    challenger_id,
                    ServerEvent::ChallengeResponse(ChallengeResponsePayload {
                        response: ChallengeReply::Declined,
                        responder: responder.clone(),
                    }),
                );
                Ok(None)
            }
            ChallengeReply::Accepted => {
                let players = [challenger_id, responder.user_id];
                match self
                    .coordinator
                    .create_match(challenger_id, responder.user_id, None)
                    .await
                {
                    Ok(duel) => {
                        for user_id in players {
                            self.fanout.publish_to_user(
                                user_id,
                                ServerEvent::MatchStartCountdown(MatchStartCountdownPayload {
                                    match_id: duel.id,
                                }),
                            );
                        }
                        Ok(Some(duel.id))
                    }
                    Err(e) => {
                        warn!(
                            challenger_id,
                            responder_id = responder.user_id,
                            error = %e,
                            "Match creation failed"
                        );
                        let message = match e {
                            CoreError::Database(_) => "Failed to create match".to_owned(),
                            other => other.to_string(),
                        };
                        for user_id in players {
                            self.fanout
                                .publish_to_user(user_id, ServerEvent::error(message.clone()));
                        }
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Drop every challenge involving a user whose last dashboard closed.
    /// Targets of their outgoing challenges are told it was withdrawn.
    pub fn forget(&self, user: &PlayerRef) {
        let mut withdrawn = Vec::new();
        self.challenges.retain(|(challenger, target)| {
            if *challenger == user.user_id {
                withdrawn.push(*target);
                false
            } else {
                *target != user.user_id
            }
        });
        for target_id in withdrawn {
            self.notify_cancelled(user, target_id);
        }
    }

    fn notify_cancelled(&self, challenger: &PlayerRef, target_id: i32) {
        self.fanout.publish_to_user(
            target_id,
            ServerEvent::ChallengeCancelled(ChallengeCancelledPayload {
                challenger: challenger.clone(),
            }),
        );
    }
}

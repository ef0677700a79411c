//! Real-time event delivery.
//!
//! Each live match owns a broadcast channel; a single global channel carries
//! dashboard updates. Signed-in dashboards also register a personal inbox
//! for direct events. Sends never block: a channel with no receivers simply
//! drops the event, and slow receivers observe `Lagged`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use common::event::{EventKind, ServerEvent};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Where events of a given kind are allowed to go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventScope {
    /// Both participants of one match.
    Match,
    /// Every dashboard subscriber.
    Global,
    /// One connection, or the inboxes of one user.
    Direct,
}

#[derive(Debug, Error, PartialEq)]
pub enum FanoutError {
    #[error("event kind '{0}' has no delivery scope")]
    Unrouted(EventKind),
    #[error("event kind '{kind}' is {expected:?}-scoped, refused on {requested:?} channel")]
    WrongScope {
        kind: EventKind,
        expected: EventScope,
        requested: EventScope,
    },
}

/// Maps every event kind to its delivery scope.
#[derive(Clone, Debug)]
pub struct EventRegistry {
    routes: HashMap<EventKind, EventScope>,
}

impl EventRegistry {
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        Self::empty()
            .route(EventKind::MatchStart, EventScope::Match)
            .route(EventKind::SubmissionPending, EventScope::Match)
            .route(EventKind::SubmissionUpdate, EventScope::Match)
            .route(EventKind::MatchEnd, EventScope::Match)
            .route(EventKind::PlayerEvent, EventScope::Match)
            .route(EventKind::UserUpdate, EventScope::Global)
            .route(EventKind::PlayerList, EventScope::Direct)
            .route(EventKind::ChallengeReceived, EventScope::Direct)
            .route(EventKind::ChallengeCancelled, EventScope::Direct)
            .route(EventKind::ChallengeResponse, EventScope::Direct)
            .route(EventKind::MatchStartCountdown, EventScope::Direct)
            .route(EventKind::Error, EventScope::Direct)
    }

    pub fn route(mut self, kind: EventKind, scope: EventScope) -> Self {
        self.routes.insert(kind, scope);
        self
    }

    pub fn scope_of(&self, kind: EventKind) -> Option<EventScope> {
        self.routes.get(&kind).copied()
    }

    /// Every event kind must have a route.
    pub fn validate(&self) -> Result<(), FanoutError> {
        match EventKind::ALL.iter().find(|k| !self.routes.contains_key(k)) {
            Some(kind) => Err(FanoutError::Unrouted(*kind)),
            None => Ok(()),
        }
    }

    fn check(&self, event: &ServerEvent, requested: EventScope) -> Result<(), FanoutError> {
        let kind = event.kind();
        match self.scope_of(kind) {
            None => Err(FanoutError::Unrouted(kind)),
            Some(expected) if expected != requested => Err(FanoutError::WrongScope {
                kind,
                expected,
                requested,
            }),
            Some(_) => Ok(()),
        }
    }
}

pub struct Fanout {
    registry: EventRegistry,
    matches: DashMap<i32, broadcast::Sender<ServerEvent>>,
    global: broadcast::Sender<ServerEvent>,
    inboxes: DashMap<i32, Vec<(u64, mpsc::UnboundedSender<ServerEvent>)>>,
    next_inbox: AtomicU64,
    capacity: usize,
}

impl Fanout {
    pub const DEFAULT_CAPACITY: usize = 128;

    /// Fails if the registry leaves any event kind unrouted.
    pub fn new(registry: EventRegistry, capacity: usize) -> Result<Self, FanoutError> {
        registry.validate()?;
        let (global, _) = broadcast::channel(capacity);
        Ok(Self {
            registry,
            matches: DashMap::new(),
            global,
            inboxes: DashMap::new(),
            next_inbox: AtomicU64::new(1),
            capacity,
        })
    }

    pub fn subscribe_match(&self, match_id: i32) -> broadcast::Receiver<ServerEvent> {
        self.matches
            .entry(match_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<ServerEvent> {
        self.global.subscribe()
    }

    /// Returns the number of receivers reached.
    pub fn broadcast_to_match(&self, match_id: i32, event: ServerEvent) -> Result<usize, FanoutError> {
        self.registry.check(&event, EventScope::Match)?;
        let kind = event.kind();
        let reached = match self.matches.get(&match_id) {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        };
        debug!(match_id, %kind, reached, "Broadcast to match");
        Ok(reached)
    }

    pub fn broadcast_global(&self, event: ServerEvent) -> Result<usize, FanoutError> {
        self.registry.check(&event, EventScope::Global)?;
        Ok(self.global.send(event).unwrap_or(0))
    }

    /// Same as [`Fanout::broadcast_to_match`] but logs instead of returning routing errors.
    pub fn publish_to_match(&self, match_id: i32, event: ServerEvent) {
        if let Err(e) = self.broadcast_to_match(match_id, event) {
            warn!(match_id, error = %e, "Refused match broadcast");
        }
    }

    pub fn publish_global(&self, event: ServerEvent) {
        if let Err(e) = self.broadcast_global(event) {
            warn!(error = %e, "Refused global broadcast");
        }
    }

    /// Drop the match channel. Receivers drain buffered events, then see `Closed`.
    pub fn close_match(&self, match_id: i32) {
        self.matches.remove(&match_id);
    }

    /// Add a personal inbox for `user_id`; keep the id to unregister it.
    pub fn register_inbox(&self, user_id: i32, tx: mpsc::UnboundedSender<ServerEvent>) -> u64 {
        let id = self.next_inbox.fetch_add(1, Ordering::Relaxed);
        self.inboxes.entry(user_id).or_default().push((id, tx));
        id
    }

    pub fn unregister_inbox(&self, user_id: i32, inbox_id: u64) {
        if let Some(mut inboxes) = self.inboxes.get_mut(&user_id) {
            inboxes.retain(|(id, _)| *id != inbox_id);
        }
        self.inboxes.remove_if(&user_id, |_, inboxes| inboxes.is_empty());
    }

    /// Whether `user_id` has at least one open inbox.
    pub fn is_reachable(&self, user_id: i32) -> bool {
        self.inboxes.contains_key(&user_id)
    }

    /// Deliver a direct event to every inbox of `user_id`. Returns the number reached.
    pub fn send_to_user(&self, user_id: i32, event: ServerEvent) -> Result<usize, FanoutError> {
        self.registry.check(&event, EventScope::Direct)?;
        let reached = match self.inboxes.get_mut(&user_id) {
            Some(mut inboxes) => {
                inboxes.retain(|(_, tx)| tx.send(event.clone()).is_ok());
                inboxes.len()
            }
            None => 0,
        };
        debug!(user_id, kind = %event.kind(), reached, "Direct send");
        Ok(reached)
    }

    pub fn publish_to_user(&self, user_id: i32, event: ServerEvent) {
        if let Err(e) = self.send_to_user(user_id, event) {
            warn!(user_id, error = %e, "Refused direct send");
        }
    }
}

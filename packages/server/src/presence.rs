use std::collections::HashMap;
use std::sync::Arc;

use common::event::{PlayerEventPayload, PresenceChange, ServerEvent};
use dashmap::DashMap;

use crate::fanout::Fanout;

/// Which users are connected to which match.
///
/// A user may hold several sockets to the same match; they count as present
/// until the last one goes away. Join and leave events are published only on
/// those edges.
pub struct PresenceTracker {
    sets: DashMap<i32, HashMap<i32, usize>>,
    fanout: Arc<Fanout>,
}

impl PresenceTracker {
    pub fn new(fanout: Arc<Fanout>) -> Self {
        Self {
            sets: DashMap::new(),
            fanout,
        }
    }

    /// Register a connection. Returns the number of distinct users present.
    pub fn join(&self, match_id: i32, user_id: i32, username: &str) -> usize {
        let (size, first) = {
            let mut set = self.sets.entry(match_id).or_default();
            let count = set.entry(user_id).or_insert(0);
            *count += 1;
            let first = *count == 1;
            (set.len(), first)
        };
        if first {
            self.publish(match_id, user_id, username, PresenceChange::Joined);
        }
        size
    }

    /// Unregister a connection. Returns the number of distinct users still present.
    pub fn leave(&self, match_id: i32, user_id: i32, username: &str) -> usize {
        let (size, last) = match self.sets.get_mut(&match_id) {
            Some(mut set) => {
                let count = set.get(&user_id).copied();
                let last = match count {
                    Some(n) if n > 1 => {
                        set.insert(user_id, n - 1);
                        false
                    }
                    Some(_) => {
                        set.remove(&user_id);
                        true
                    }
                    None => false,
                };
                (set.len(), last)
            }
            None => (0, false),
        };
        self.sets.remove_if(&match_id, |_, set| set.is_empty());
        if last {
            self.publish(match_id, user_id, username, PresenceChange::Left);
        }
        size
    }

    pub fn both_present(&self, match_id: i32) -> bool {
        self.sets
            .get(&match_id)
            .map(|set| set.len() >= 2)
            .unwrap_or(false)
    }

    pub fn is_present(&self, match_id: i32, user_id: i32) -> bool {
        self.sets
            .get(&match_id)
            .map(|set| set.contains_key(&user_id))
            .unwrap_or(false)
    }

    /// Snapshot of present user ids, ascending.
    pub fn present(&self, match_id: i32) -> Vec<i32> {
        let mut users: Vec<i32> = self
            .sets
            .get(&match_id)
            .map(|set| set.keys().copied().collect())
            .unwrap_or_default();
        users.sort_unstable();
        users
    }

    pub fn clear(&self, match_id: i32) {
        self.sets.remove(&match_id);
    }

    fn publish(&self, match_id: i32, user_id: i32, username: &str, event: PresenceChange) {
        self.fanout.publish_to_match(
            match_id,
            ServerEvent::PlayerEvent(PlayerEventPayload {
                event,
                user_id,
                username: username.to_string(),
            }),
        );
    }
}

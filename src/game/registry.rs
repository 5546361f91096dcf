//! Registry of connected players
//!
//! The single source of truth for who is connected. The registry itself is
//! not synchronised; callers share it behind one `parking_lot::Mutex` (see
//! [`crate::net::game_session::GameSession`]) and hold that lock for a whole
//! command or a whole combat tick.

use hashbrown::HashMap;
use tracing::{debug, info};

use crate::game::outbox::SendError;
use crate::game::player::{Player, PlayerId};

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Player {0} is already registered")]
    AlreadyRegistered(PlayerId),
}

/// Mapping from session key to the player it owns
#[derive(Debug, Default)]
pub struct Registry {
    players: HashMap<PlayerId, Player>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Insert a freshly connected player under its session key
    pub fn register(&mut self, player: Player) -> Result<PlayerId, RegistryError> {
        let id = player.id();
        if self.players.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        self.players.insert(id, player);
        debug!("Registered {} ({} connected)", id, self.players.len());
        Ok(id)
    }

    /// Find a player by display name, ignoring case
    pub fn lookup(&self, name: &str) -> Option<PlayerId> {
        let wanted = name.to_lowercase();
        self.players
            .values()
            .find(|p| p.name().to_lowercase() == wanted)
            .map(Player::id)
    }

    /// Unconditional removal; frees both the key and the name
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Snapshot of every registered key, in no particular order
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Number of named (non-crowd) players
    pub fn visible_count(&self) -> usize {
        self.players.values().filter(|p| p.is_visible()).count()
    }

    /// Send a line to one player; a failed send disconnects them
    pub fn deliver(&mut self, id: PlayerId, text: impl Into<String>) -> Result<(), SendError> {
        let result = match self.players.get(&id) {
            Some(player) => player.send(text),
            None => Err(SendError::Closed),
        };
        if result.is_err() {
            self.disconnect(id);
        }
        result
    }

    /// Send `message` to every player matching `filter` except `exclude`
    ///
    /// Recipients whose send fails are disconnected after the fan-out, so one
    /// dead connection never stops delivery to the rest. Returns the number
    /// of successful deliveries.
    pub fn broadcast<F>(&mut self, message: &str, filter: F, exclude: Option<PlayerId>) -> usize
    where
        F: Fn(&Player) -> bool,
    {
        let (delivered, failed) = self.fan_out(message, filter, exclude);
        for id in failed {
            self.disconnect(id);
        }
        delivered
    }

    /// Remove a player and tell the named players they left
    ///
    /// Any send failure during the departure notice disconnects that
    /// recipient too. Disconnecting an absent player is a no-op; returns
    /// whether `id` was present.
    pub fn disconnect(&mut self, id: PlayerId) -> bool {
        let mut pending = vec![id];
        let mut found = false;

        while let Some(next) = pending.pop() {
            let Some(player) = self.players.remove(&next) else {
                continue;
            };
            found |= next == id;
            info!("{} ({}) disconnected", player.name(), next);

            if player.is_visible() {
                let notice = format!("{} vanishes into the crowd.", player.name());
                let (_, failed) = self.fan_out(&notice, Player::is_visible, None);
                pending.extend(failed);
            }
        }
        found
    }

    /// Drop every player, closing their outboxes
    pub fn clear(&mut self) -> usize {
        let count = self.players.len();
        self.players.clear();
        count
    }

    fn fan_out<F>(&self, message: &str, filter: F, exclude: Option<PlayerId>) -> (usize, Vec<PlayerId>)
    where
        F: Fn(&Player) -> bool,
    {
        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, player) in &self.players {
            if Some(*id) == exclude || !filter(player) {
                continue;
            }
            match player.send(message) {
                Ok(()) => delivered += 1,
                Err(_) => failed.push(*id),
            }
        }
        (delivered, failed)
    }
}

//! Player state and derived-stat formulas

use std::fmt;
use std::net::SocketAddr;

use crate::game::constants::{combat, rules};
use crate::game::outbox::{Outbox, SendError};
use crate::game::transition::{self, Event, TransitionError};

/// Session key, taken from the peer address of the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(SocketAddr);

impl PlayerId {
    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for PlayerId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The five trainable attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Str,
    Dex,
    Sta,
    Siz,
    Wit,
}

impl Stat {
    pub const ALL: [Stat; 5] = [Stat::Str, Stat::Dex, Stat::Sta, Stat::Siz, Stat::Wit];

    fn index(self) -> usize {
        match self {
            Stat::Str => 0,
            Stat::Dex => 1,
            Stat::Sta => 2,
            Stat::Siz => 3,
            Stat::Wit => 4,
        }
    }

    /// Long name used in replies ("strength", "dexterity", ...)
    pub fn name(self) -> &'static str {
        match self {
            Stat::Str => "strength",
            Stat::Dex => "dexterity",
            Stat::Sta => "stamina",
            Stat::Siz => "size",
            Stat::Wit => "wit",
        }
    }

    /// Three-letter command keyword ("str", "dex", ...)
    pub fn keyword(self) -> &'static str {
        match self {
            Stat::Str => "str",
            Stat::Dex => "dex",
            Stat::Sta => "sta",
            Stat::Siz => "siz",
            Stat::Wit => "wit",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Stat> {
        Stat::ALL
            .into_iter()
            .find(|stat| stat.keyword().eq_ignore_ascii_case(word))
    }
}

/// Attribute values, indexed by [`Stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats([u16; 5]);

impl Stats {
    pub fn new(strength: u16, dexterity: u16, stamina: u16, size: u16, wit: u16) -> Self {
        Self([strength, dexterity, stamina, size, wit])
    }

    pub fn get(&self, stat: Stat) -> u16 {
        self.0[stat.index()]
    }

    pub fn set(&mut self, stat: Stat, value: u16) {
        self.0[stat.index()] = value;
    }

    pub fn total(&self) -> u16 {
        self.0.iter().sum()
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self([rules::STARTING_STAT; 5])
    }
}

/// Where a player is in the game's progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Unnamed spectator
    Crowd,
    /// Named and idle
    Citizen,
    /// Allocating stat points
    Training,
    /// Eligible to fight
    Gladiator,
    /// Has an outstanding challenge
    Challenger,
    /// In the arena
    Fighting,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Crowd => "crowd",
            Status::Citizen => "citizen",
            Status::Training => "training",
            Status::Gladiator => "gladiator",
            Status::Challenger => "challenger",
            Status::Fighting => "fighting",
        }
    }

    /// Can be challenged, or challenge someone
    pub fn is_duelist(self) -> bool {
        matches!(self, Status::Gladiator | Status::Challenger)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Training limits, read once from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// Aggregate cap across all stats
    pub max_train: u16,
    /// Cap on any single stat
    pub max_stat: u16,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_train: rules::MAX_TRAIN,
            max_stat: rules::MAX_STAT,
        }
    }
}

/// Why a training attempt changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TrainError {
    #[error("No remaining points.")]
    NoPointsLeft,
    #[error("{} already at max.", .0.name())]
    AlreadyMaxed(Stat),
}

/// Lifetime fight record of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Record {
    pub wins: u64,
    pub losses: u64,
    pub kills: u64,
}

/// A connected session's game state
#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    name: String,
    status: Status,
    outbox: Outbox,
    opponent: Option<PlayerId>,
    pub stats: Stats,
    pub record: Record,
    /// Damage taken in the current (or last) fight
    pub dam: u16,
    /// Speed ticks accumulated since the last action
    pub spd: u16,
}

impl Player {
    pub fn new(id: PlayerId, outbox: Outbox) -> Self {
        Self {
            id,
            name: rules::CROWD_NAME.to_string(),
            status: Status::Crowd,
            outbox,
            opponent: None,
            stats: Stats::default(),
            record: Record::default(),
            dam: 0,
            spd: 0,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Named players are listed by `who` and hear global chatter
    pub fn is_visible(&self) -> bool {
        self.status != Status::Crowd
    }

    /// Move to the next status, if the transition table allows it
    pub fn apply(&mut self, event: Event) -> Result<Status, TransitionError> {
        self.status = transition::next(self.status, event)?;
        Ok(self.status)
    }

    #[cfg(test)]
    pub(crate) fn force_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Pending or current opponent; may no longer be registered
    pub fn opponent(&self) -> Option<PlayerId> {
        self.opponent
    }

    pub(crate) fn set_opponent(&mut self, opponent: Option<PlayerId>) {
        self.opponent = opponent;
    }

    /// Reset the combat counters at the start of a fight
    pub fn ready_for_fight(&mut self) {
        self.dam = 0;
        self.spd = 0;
    }

    pub fn send(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.outbox.send(text)
    }

    pub fn health(&self) -> u16 {
        self.stats.get(Stat::Str) + self.stats.get(Stat::Sta) * 7 + self.stats.get(Stat::Siz) * 3
    }

    pub fn attack(&self) -> u16 {
        self.stats.get(Stat::Dex) * 2 + self.stats.get(Stat::Siz)
    }

    pub fn defence(&self) -> u16 {
        self.stats.get(Stat::Wit) * 2 + self.stats.get(Stat::Dex)
    }

    pub fn damage(&self) -> u16 {
        self.stats.get(Stat::Str) * 3 + self.stats.get(Stat::Siz)
    }

    pub fn speed(&self) -> u16 {
        combat::BASE_SPEED
            .saturating_sub((self.stats.get(Stat::Wit) * 2 + self.stats.get(Stat::Dex)) / 3)
    }

    /// Wounds remaining, floored at zero
    pub fn wounds(&self) -> u16 {
        self.health().saturating_sub(self.dam)
    }

    pub fn can_train(&self, rules: &GameRules) -> bool {
        self.stats.total() < rules.max_train
    }

    pub fn stats_left(&self, rules: &GameRules) -> u16 {
        rules.max_train.saturating_sub(self.stats.total())
    }

    /// Raise one stat by a point; returns the new value
    pub fn train(&mut self, stat: Stat, rules: &GameRules) -> Result<u16, TrainError> {
        if !self.can_train(rules) {
            return Err(TrainError::NoPointsLeft);
        }
        let value = self.stats.get(stat);
        if value >= rules.max_stat {
            return Err(TrainError::AlreadyMaxed(stat));
        }
        self.stats.set(stat, value + 1);
        Ok(value + 1)
    }
}

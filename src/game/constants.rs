/// Character rules - stat caps and name limits
pub mod rules {
    /// Starting value of every stat
    pub const STARTING_STAT: u16 = 1;
    /// Highest value a single stat can be trained to
    pub const MAX_STAT: u16 = 9;
    /// Aggregate cap across all five stats
    pub const MAX_TRAIN: u16 = 30;
    /// Largest MAX_STAT for which Health (STR + STA*7 + SIZ*3) fits in a u16
    pub const STAT_LIMIT: u16 = u16::MAX / 11;
    /// Shortest allowed character name
    pub const NAME_MIN_LEN: usize = 3;
    /// Longest allowed character name
    pub const NAME_MAX_LEN: usize = 15;
    /// Display name of an unnamed spectator
    pub const CROWD_NAME: &str = "Someone in the crowd";
}

/// Combat constants
pub mod combat {
    /// Base value of the speed formula: Speed = BASE_SPEED - (WIT*2 + DEX) / 3
    pub const BASE_SPEED: u16 = 10;
    /// Added to Speed() to get the Spd threshold an action must exceed
    pub const SPEED_SLACK: u16 = 3;
    /// rnd() draws from [0, DIE_SIDES)
    pub const DIE_SIDES: u16 = 10;
    /// Contest results below this are misses
    pub const HIT_THRESHOLD: i32 = 1;
    /// Contest results at or above this land full damage
    pub const FULL_HIT_THRESHOLD: i32 = 6;
}

/// Timing constants
pub mod timing {
    /// Combat tick interval in milliseconds
    pub const TICK_INTERVAL_MS: u64 = 1000;
    /// How long shutdown waits for sessions to flush before giving up
    pub const DRAIN_TIMEOUT_MS: u64 = 2000;
}

/// Network constants
pub mod net {
    /// Default listening port
    pub const PORT: u16 = 3000;
    /// Longest accepted input line in bytes (excluding the terminator)
    pub const MAX_LINE_LENGTH: usize = 1024;
    /// Lines queued for one client before it counts as dead
    pub const OUTBOX_CAPACITY: usize = 1024;
}

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{net, rules, timing};
use crate::game::player::GameRules;

/// Server configuration, read once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// Interval between combat ticks
    pub tick_interval: Duration,
    /// Training caps
    pub rules: GameRules,
    /// Password accepted by the `shutdown` command
    pub shutdown_password: String,
    /// Longest accepted input line in bytes
    pub max_line_length: usize,
    /// Port for the metrics endpoint; `None` disables it
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: net::PORT,
            tick_interval: Duration::from_millis(timing::TICK_INTERVAL_MS),
            rules: GameRules::default(),
            shutdown_password: "topsecret".to_string(),
            max_line_length: net::MAX_LINE_LENGTH,
            metrics_port: Some(9090),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("tick interval must be at least 1ms")]
    ZeroTickInterval,
    #[error("MAX_STAT must be at least {}", rules::STARTING_STAT)]
    StatCapTooLow,
    #[error("MAX_STAT must be at most {max}")]
    StatCapTooHigh { max: u16 },
    #[error("MAX_TRAIN must be between {min} and {max}")]
    TrainCapOutOfRange { min: u16, max: u16 },
    #[error("shutdown password cannot be empty")]
    EmptyPassword,
    #[error("max_line_length must be at least 16 bytes")]
    LineLengthTooSmall,
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from a key lookup, falling back to defaults per field
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "BIND_ADDRESS") {
            config.bind_address = addr;
        }

        if let Some(port) = parse_var::<u16, _>(&lookup, "PORT") {
            config.port = port;
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, "TICK_INTERVAL_MS") {
            if ms > 0 {
                config.tick_interval = Duration::from_millis(ms);
            } else {
                tracing::warn!("TICK_INTERVAL_MS must be > 0, using default");
            }
        }

        if let Some(max_train) = parse_var(&lookup, "MAX_TRAIN") {
            config.rules.max_train = max_train;
        }

        if let Some(max_stat) = parse_var(&lookup, "MAX_STAT") {
            config.rules.max_stat = max_stat;
        }

        if let Some(password) = lookup("SHUTDOWN_PASSWORD") {
            if password.trim().is_empty() {
                tracing::warn!("SHUTDOWN_PASSWORD is empty, using default");
            } else {
                config.shutdown_password = password.trim().to_string();
            }
        }

        if let Some(len) = parse_var(&lookup, "MAX_LINE_LENGTH") {
            config.max_line_length = len;
        }

        if let Some(port) = parse_var::<u16, _>(&lookup, "METRICS_PORT") {
            config.metrics_port = (port > 0).then_some(port);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.rules.max_stat < rules::STARTING_STAT {
            return Err(ConfigError::StatCapTooLow);
        }
        // Derived values are u16; Health grows fastest at 11 per stat point
        if self.rules.max_stat > rules::STAT_LIMIT {
            return Err(ConfigError::StatCapTooHigh {
                max: rules::STAT_LIMIT,
            });
        }
        // Five stats start at STARTING_STAT and none can pass max_stat
        let min = rules::STARTING_STAT * 5;
        let max = self.rules.max_stat.saturating_mul(5);
        if self.rules.max_train < min || self.rules.max_train > max {
            return Err(ConfigError::TrainCapOutOfRange { min, max });
        }
        if self.shutdown_password.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }
        if self.max_line_length < 16 {
            return Err(ConfigError::LineLengthTooSmall);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outbox::Outbox;
    use crate::game::player::{Player, PlayerId, Stats};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.rules.max_train, 30);
        assert_eq!(config.rules.max_stat, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = ServerConfig::load_or_default();
        assert!(config.max_line_length > 0);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "4000"),
            ("TICK_INTERVAL_MS", "250"),
            ("MAX_TRAIN", "25"),
            ("SHUTDOWN_PASSWORD", " hunter2 "),
            ("METRICS_PORT", "0"),
        ]));

        assert_eq!(config.port, 4000);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.rules.max_train, 25);
        assert_eq!(config.shutdown_password, "hunter2");
        assert_eq!(config.metrics_port, None);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("TICK_INTERVAL_MS", "0"),
            ("BIND_ADDRESS", "nowhere"),
        ]));

        assert_eq!(config.port, 3000);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.bind_address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn test_validate_train_cap() {
        let mut config = ServerConfig::default();
        config.rules.max_train = 46;
        assert_eq!(
            config.validate(),
            Err(ConfigError::TrainCapOutOfRange { min: 5, max: 45 })
        );

        config.rules.max_train = 4;
        assert!(config.validate().is_err());

        config.rules.max_train = 45;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_stat_cap_upper_bound() {
        let mut config = ServerConfig::default();
        config.rules.max_stat = 10_000;
        config.rules.max_train = 30_000;
        assert_eq!(
            config.validate(),
            Err(ConfigError::StatCapTooHigh { max: 5957 })
        );

        // At the limit every formula still fits
        config.rules.max_stat = rules::STAT_LIMIT;
        config.rules.max_train = rules::STAT_LIMIT * 5;
        assert!(config.validate().is_ok());

        let (outbox, _rx) = Outbox::channel();
        let mut player = Player::new(PlayerId::from(SocketAddr::from(([127, 0, 0, 1], 4000))), outbox);
        let cap = rules::STAT_LIMIT;
        player.stats = Stats::new(cap, cap, cap, cap, cap);
        assert_eq!(player.health(), cap * 11);
        assert_eq!(player.damage(), cap * 4);
        assert_eq!(player.stats.total(), cap * 5);
    }
}

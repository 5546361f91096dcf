//! Shared game state and the lifecycle loop
//!
//! One `GameSession` exists per server. It owns the registry behind the
//! process-wide lock and drives the combat tick until shutdown is requested.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::commands::{self, CommandContext, CommandError};
use crate::config::ServerConfig;
use crate::game::dice::Dice;
use crate::game::player::{GameRules, PlayerId, Status};
use crate::game::registry::Registry;
use crate::game::systems::combat::{self, TickReport};
use crate::metrics::Metrics;
use crate::net::line::tokenize;

/// Ticks between periodic status log lines
const STATS_LOG_INTERVAL: u64 = 60;

/// Process-wide shutdown request, naming whoever asked for it
#[derive(Debug, Default)]
pub struct ShutdownFlag {
    requested_by: Mutex<Option<String>>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; the first request wins. Returns whether this call set it.
    pub fn request(&self, by: impl Into<String>) -> bool {
        let mut slot = self.requested_by.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(by.into());
        true
    }

    pub fn requested_by(&self) -> Option<String> {
        self.requested_by.lock().clone()
    }

    pub fn is_requested(&self) -> bool {
        self.requested_by.lock().is_some()
    }
}

/// State shared by every session task and the lifecycle loop
pub struct GameSession {
    registry: Mutex<Registry>,
    rules: GameRules,
    shutdown_password: String,
    shutdown: ShutdownFlag,
    tick_interval: Duration,
    max_line_length: usize,
    metrics: Arc<Metrics>,
}

impl GameSession {
    pub fn new(config: &ServerConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            rules: config.rules,
            shutdown_password: config.shutdown_password.clone(),
            shutdown: ShutdownFlag::new(),
            tick_interval: config.tick_interval,
            max_line_length: config.max_line_length,
            metrics,
        }
    }

    /// Take the process-wide lock. Never hold the guard across an `.await`.
    pub fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock()
    }

    pub fn shutdown(&self) -> &ShutdownFlag {
        &self.shutdown
    }

    pub fn request_shutdown(&self, by: impl Into<String>) -> bool {
        self.shutdown.request(by)
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Dispatch one input line for `id` under the lock
    ///
    /// Returns whether the player is still registered afterwards; `quit` and
    /// failed sends both remove them.
    pub fn handle_line(&self, id: PlayerId, line: &str) -> Result<bool, CommandError> {
        self.metrics.lines_received.fetch_add(1, Ordering::Relaxed);
        let tokens = tokenize(line);

        let mut registry = self.registry.lock();
        if !tokens.is_empty() {
            let mut ctx = CommandContext {
                registry: &mut *registry,
                id,
                rules: &self.rules,
                shutdown: &self.shutdown,
                password: &self.shutdown_password,
            };
            commands::dispatch(&mut ctx, &tokens)?;
        }
        Ok(registry.contains(id))
    }

    /// Run one combat pass and refresh the player gauges
    pub fn tick_once(&self, dice: &mut impl Dice) -> TickReport {
        let start = Instant::now();
        let mut registry = self.registry.lock();
        let report = combat::tick(&mut registry, dice);

        let named = registry.visible_count();
        let fighting = registry
            .players()
            .filter(|p| p.status() == Status::Fighting)
            .count();
        self.metrics.players_total.store(registry.len() as u64, Ordering::Relaxed);
        drop(registry);

        self.metrics.players_named.store(named as u64, Ordering::Relaxed);
        self.metrics.players_fighting.store(fighting as u64, Ordering::Relaxed);
        self.metrics.record_tick(&report, start.elapsed());
        report
    }

    /// Tell everyone who stopped the server
    pub fn announce_shutdown(&self, by: &str) -> usize {
        self.registry()
            .broadcast(&format!("[Shutdown by {}]", by), |_| true, None)
    }

    /// Drop every player, closing their outboxes so writer tasks finish
    pub fn close_all(&self) -> usize {
        self.registry().clear()
    }
}

/// Drive the combat tick until shutdown is requested; returns the issuer
pub async fn run_game_loop<D>(session: Arc<GameSession>, mut dice: D) -> String
where
    D: Dice,
{
    let mut ticker = interval(session.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let report = session.tick_once(&mut dice);
        if report.exchanges > 0 {
            debug!(
                "Tick: {} exchanges, {} kills, {} forfeits",
                report.exchanges, report.kills, report.forfeits
            );
        }

        let tick = session.metrics().tick_count.load(Ordering::Relaxed);
        if tick % STATS_LOG_INTERVAL == 0 {
            let snapshot = session.metrics().snapshot();
            info!(
                "Tick {}: {} connected, {} named, {} fighting, p95 {}us",
                tick,
                snapshot.players_total,
                snapshot.players_named,
                snapshot.players_fighting,
                snapshot.tick_time_p95_us
            );
        }

        if let Some(by) = session.shutdown().requested_by() {
            session.announce_shutdown(&by);
            info!("Shutdown by {}.", by);
            return by;
        }
    }
}

/// Start the lifecycle loop on its own task
pub fn start_game_loop<D>(session: Arc<GameSession>, dice: D) -> JoinHandle<String>
where
    D: Dice + Send + 'static,
{
    tokio::spawn(run_game_loop(session, dice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dice::LoadedDice;
    use crate::game::registry::test_support::{drain, join};

    fn session() -> Arc<GameSession> {
        let config = ServerConfig {
            tick_interval: Duration::from_millis(5),
            ..ServerConfig::default()
        };
        Arc::new(GameSession::new(&config, Arc::new(Metrics::new())))
    }

    #[test]
    fn test_shutdown_first_request_wins() {
        let flag = ShutdownFlag::new();
        assert!(!flag.is_requested());
        assert!(flag.request("Maximus"));
        assert!(!flag.request("Commodus"));
        assert_eq!(flag.requested_by().as_deref(), Some("Maximus"));
    }

    #[test]
    fn test_handle_line_ignores_blank_input() {
        let session = session();
        let (id, mut rx) = join(&mut session.registry(), 4000);

        assert_eq!(session.handle_line(id, "   "), Ok(true));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(session.metrics().lines_received.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_handle_line_quit_removes_player() {
        let session = session();
        let (id, _rx) = join(&mut session.registry(), 4000);

        assert_eq!(session.handle_line(id, "quit"), Ok(false));
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_concurrent_creates_differing_in_case() {
        for _ in 0..200 {
            let session = session();
            let (a, _rx_a) = join(&mut session.registry(), 4000);
            let (b, _rx_b) = join(&mut session.registry(), 4001);

            std::thread::scope(|scope| {
                scope.spawn(|| session.handle_line(a, "create maximus"));
                scope.spawn(|| session.handle_line(b, "create MAXIMUS"));
            });

            let registry = session.registry();
            assert_eq!(registry.visible_count(), 1);
            let winner = registry.lookup("Maximus").unwrap();
            assert!(winner == a || winner == b);
            assert!(registry.get(winner).unwrap().name().eq_ignore_ascii_case("maximus"));
        }
    }

    #[test]
    fn test_tick_once_updates_gauges() {
        let session = session();
        let (a, _rx_a) = join(&mut session.registry(), 4000);
        let (_b, _rx_b) = join(&mut session.registry(), 4001);
        session.handle_line(a, "create Maximus").unwrap();

        session.tick_once(&mut LoadedDice::new([0]));

        let metrics = session.metrics();
        assert_eq!(metrics.players_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.players_named.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_game_loop_stops_on_shutdown() {
        let session = session();
        let (_a, mut rx_a) = join(&mut session.registry(), 4000);

        let handle = start_game_loop(session.clone(), LoadedDice::new([0]));
        session.request_shutdown("Maximus");

        let by = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by, "Maximus");
        // Crowd members hear the shutdown too
        assert_eq!(drain(&mut rx_a), vec!["[Shutdown by Maximus]"]);
    }
}

//! Prometheus-compatible metrics endpoint
//!
//! Exposes server counters in Prometheus text format and as JSON.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::game::systems::combat::TickReport;

/// Metrics registry for the game server
#[derive(Debug)]
pub struct Metrics {
    // Sessions
    pub connections_active: AtomicU64,
    pub connections_total: AtomicU64,

    // Player counts, refreshed every tick
    pub players_total: AtomicU64,
    pub players_named: AtomicU64,
    pub players_fighting: AtomicU64,

    // Combat
    pub exchanges_total: AtomicU64,
    pub kills_total: AtomicU64,
    pub forfeits_total: AtomicU64,

    // Traffic
    pub lines_received: AtomicU64,
    pub messages_sent: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

/// Point-in-time copy of every counter, used for the JSON endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub players_total: u64,
    pub players_named: u64,
    pub players_fighting: u64,
    pub exchanges_total: u64,
    pub kills_total: u64,
    pub forfeits_total: u64,
    pub lines_received: u64,
    pub messages_sent: u64,
    pub tick_time_us: u64,
    pub tick_time_p95_us: u64,
    pub tick_time_p99_us: u64,
    pub tick_time_max_us: u64,
    pub tick_count: u64,
    pub uptime_seconds: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            players_total: AtomicU64::new(0),
            players_named: AtomicU64::new(0),
            players_fighting: AtomicU64::new(0),
            exchanges_total: AtomicU64::new(0),
            kills_total: AtomicU64::new(0),
            forfeits_total: AtomicU64::new(0),
            lines_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(1000)),
        }
    }

    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        // Saturate rather than wrap if a close is ever double counted
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Fold one combat tick into the counters
    pub fn record_tick(&self, report: &TickReport, duration: Duration) {
        self.exchanges_total
            .fetch_add(report.exchanges as u64, Ordering::Relaxed);
        self.kills_total.fetch_add(report.kills as u64, Ordering::Relaxed);
        self.forfeits_total
            .fetch_add(report.forfeits as u64, Ordering::Relaxed);
        self.record_tick_time(duration);
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > 1000 {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            players_total: self.players_total.load(Ordering::Relaxed),
            players_named: self.players_named.load(Ordering::Relaxed),
            players_fighting: self.players_fighting.load(Ordering::Relaxed),
            exchanges_total: self.exchanges_total.load(Ordering::Relaxed),
            kills_total: self.kills_total.load(Ordering::Relaxed),
            forfeits_total: self.forfeits_total.load(Ordering::Relaxed),
            lines_received: self.lines_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            tick_time_us: self.tick_time_us.load(Ordering::Relaxed),
            tick_time_p95_us: self.tick_time_p95_us.load(Ordering::Relaxed),
            tick_time_p99_us: self.tick_time_p99_us.load(Ordering::Relaxed),
            tick_time_max_us: self.tick_time_max_us.load(Ordering::Relaxed),
            tick_count: self.tick_count.load(Ordering::Relaxed),
            uptime_seconds: self.uptime_seconds(),
        }
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("gladiator_pits_connections_active", "Open client connections", "gauge",
            s.connections_active);
        metric!("gladiator_pits_connections_total", "Connections accepted since start", "counter",
            s.connections_total);

        metric!("gladiator_pits_players_total", "Registered players", "gauge", s.players_total);
        metric!("gladiator_pits_players_named", "Players who have left the crowd", "gauge",
            s.players_named);
        metric!("gladiator_pits_players_fighting", "Players in the arena", "gauge",
            s.players_fighting);

        metric!("gladiator_pits_exchanges_total", "Attack exchanges resolved", "counter",
            s.exchanges_total);
        metric!("gladiator_pits_kills_total", "Fights ended by a kill", "counter", s.kills_total);
        metric!("gladiator_pits_forfeits_total", "Fights ended by a vanished opponent", "counter",
            s.forfeits_total);

        metric!("gladiator_pits_lines_received_total", "Command lines received", "counter",
            s.lines_received);
        metric!("gladiator_pits_messages_sent_total", "Lines written to clients", "counter",
            s.messages_sent);

        metric!("gladiator_pits_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            s.tick_time_us);
        metric!("gladiator_pits_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            s.tick_time_p95_us);
        metric!("gladiator_pits_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            s.tick_time_p99_us);
        metric!("gladiator_pits_tick_time_max_microseconds", "Maximum tick time", "gauge",
            s.tick_time_max_us);
        metric!("gladiator_pits_tick_count", "Total ticks processed", "counter", s.tick_count);
        metric!("gladiator_pits_uptime_seconds", "Server uptime in seconds", "counter",
            s.uptime_seconds);

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    let response = if request.starts_with("GET /metrics/json")
                        || request.starts_with("GET /json")
                    {
                        http_response("200 OK", "application/json", &metrics.to_json())
                    } else if request.starts_with("GET /metrics") {
                        http_response("200 OK", "text/plain; version=0.0.4", &metrics.to_prometheus())
                    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
                        http_response("200 OK", "text/plain", "OK")
                    } else {
                        http_response("404 Not Found", "text/plain", "")
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.connections_active.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_connection_counters() {
        let metrics = Metrics::new();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();
        metrics.connection_closed();
        metrics.connection_closed();

        assert_eq!(metrics.connections_active.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.connections_total.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_record_tick() {
        let metrics = Metrics::new();
        let report = TickReport {
            exchanges: 2,
            kills: 1,
            forfeits: 0,
        };

        for i in 0..100 {
            metrics.record_tick(&report, Duration::from_micros(100 + i * 10));
        }

        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 100);
        assert_eq!(metrics.exchanges_total.load(Ordering::Relaxed), 200);
        assert_eq!(metrics.kills_total.load(Ordering::Relaxed), 100);
        assert!(metrics.tick_time_p95_us.load(Ordering::Relaxed) > 0);
        assert_eq!(metrics.tick_time_max_us.load(Ordering::Relaxed), 1090);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.players_total.store(12, Ordering::Relaxed);
        metrics.players_fighting.store(2, Ordering::Relaxed);

        let output = metrics.to_prometheus();

        assert!(output.contains("gladiator_pits_players_total 12"));
        assert!(output.contains("gladiator_pits_players_fighting 2"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_json_format() {
        let metrics = Metrics::new();
        metrics.kills_total.store(3, Ordering::Relaxed);

        let value: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(value["kills_total"], 3);
        assert_eq!(value["connections_active"], 0);
    }
}

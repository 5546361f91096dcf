//! Gladiator Pits Server Library
//!
//! A line-based multiplayer text arena over TCP. Players step out of the
//! crowd, train their stats, challenge each other and fight in real time on
//! a fixed combat tick.
//!
//! # Features
//!
//! - `metrics_http` - Prometheus/JSON metrics endpoint (enabled by default)

pub mod commands;
pub mod config;
pub mod game;
pub mod metrics;
pub mod net;

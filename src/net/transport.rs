//! TCP server
//!
//! Accepts connections, spawns a session runner for each and runs the
//! lifecycle loop. When the loop reports a shutdown the server clears the
//! registry and waits a bounded time for sessions to finish.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};

use crate::config::ServerConfig;
use crate::game::constants::timing::DRAIN_TIMEOUT_MS;
use crate::game::dice::{Dice, RandomDice};
use crate::net::game_session::{start_game_loop, GameSession};
use crate::net::session::run_session;

/// Pause after a failed accept so a full descriptor table does not spin
const ACCEPT_BACKOFF_MS: u64 = 100;

/// Line-protocol game server
pub struct GameServer {
    listener: TcpListener,
    game_session: Arc<GameSession>,
}

impl GameServer {
    /// Bind the listener described by `config`
    pub async fn bind(config: &ServerConfig, game_session: Arc<GameSession>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr()).await?;
        Ok(Self {
            listener,
            game_session,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run until shutdown with entropy-seeded dice; returns who stopped it
    pub async fn run(self) -> anyhow::Result<String> {
        self.run_with_dice(RandomDice::from_entropy()).await
    }

    /// Run until shutdown, rolling combat with `dice`
    pub async fn run_with_dice<D>(self, dice: D) -> anyhow::Result<String>
    where
        D: Dice + Send + 'static,
    {
        tracing::info!("Mud started on {}", self.local_addr()?);

        let mut game_loop = start_game_loop(self.game_session.clone(), dice);
        let mut sessions = JoinSet::new();

        let stopped_by = loop {
            tokio::select! {
                result = &mut game_loop => break result?,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!("set_nodelay failed for {}: {}", peer, e);
                        }
                        sessions.spawn(run_session(stream, peer, self.game_session.clone()));
                    }
                    Err(e) => {
                        tracing::warn!("Accept error: {}", e);
                        sleep(Duration::from_millis(ACCEPT_BACKOFF_MS)).await;
                    }
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        tracing::warn!("Session task failed: {}", e);
                    }
                }
            }
        };

        drop(self.listener);
        let closed = self.game_session.close_all();
        tracing::info!("Closing {} connections", closed);

        let drain = async { while sessions.join_next().await.is_some() {} };
        if timeout(Duration::from_millis(DRAIN_TIMEOUT_MS), drain).await.is_err() {
            tracing::warn!("{} sessions still open after drain, aborting", sessions.len());
            sessions.abort_all();
        }

        Ok(stopped_by)
    }
}

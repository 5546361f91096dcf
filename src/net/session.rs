//! Session runner: one task per accepted connection
//!
//! Reads lines, dispatches them under the registry lock and leaves the
//! writing to a companion task that drains the player's outbox. Whatever
//! ends the session, the player is disconnected from the registry on the way
//! out.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::game::constants::timing::DRAIN_TIMEOUT_MS;
use crate::game::outbox::{Inbox, Outbox};
use crate::game::player::{Player, PlayerId};
use crate::metrics::Metrics;
use crate::net::game_session::GameSession;
use crate::net::line::{read_line, write_line, FramingError};

pub const WELCOME: &str = "Welcome to the Gladiator Pits!";

/// Why a session ended
#[derive(Debug)]
enum Exit {
    /// The player is no longer registered (quit, failed send, server drain)
    Removed,
    /// The peer closed or the read failed
    Read(FramingError),
    /// The writer stopped, taking the connection with it
    WriterClosed,
}

/// Serve one connection until it ends
pub async fn run_session<S>(stream: S, peer: SocketAddr, session: Arc<GameSession>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let id = PlayerId::from(peer);
    let (read_half, write_half) = tokio::io::split(stream);
    let (outbox, rx) = Outbox::channel();

    if let Err(e) = register(&session, id, outbox) {
        warn!("Rejecting {}: {}", peer, e);
        return;
    }
    info!("Connection from {}", peer);
    session.metrics().connection_opened();

    let mut writer = tokio::spawn(write_loop(write_half, rx, session.metrics().clone()));
    let mut writer_done = false;
    let mut reader = BufReader::new(read_half);
    let max_len = session.max_line_length();

    let exit = loop {
        tokio::select! {
            line = read_line(&mut reader, max_len) => {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => break Exit::Read(e),
                };
                match session.handle_line(id, &line) {
                    Ok(true) => {}
                    Ok(false) => break Exit::Removed,
                    Err(e) => {
                        debug!("{}: {}", peer, e);
                        break Exit::Removed;
                    }
                }
            }
            _ = &mut writer => {
                writer_done = true;
                break Exit::WriterClosed;
            }
        }
    };

    match &exit {
        Exit::Read(FramingError::ConnectionClosed) | Exit::Removed => debug!("{} left: {:?}", peer, exit),
        _ => warn!("{} dropped: {:?}", peer, exit),
    }

    // Removing the player drops its outbox, which lets the writer flush and stop
    session.registry().disconnect(id);
    if !writer_done {
        let grace = Duration::from_millis(DRAIN_TIMEOUT_MS);
        if timeout(grace, &mut writer).await.is_err() {
            debug!("Writer for {} did not finish in time", peer);
            writer.abort();
        }
    }

    session.metrics().connection_closed();
    info!("Connection from {} closed", peer);
}

fn register(session: &GameSession, id: PlayerId, outbox: Outbox) -> anyhow::Result<()> {
    let mut registry = session.registry();
    registry.register(Player::new(id, outbox))?;
    registry.deliver(id, WELCOME)?;
    Ok(())
}

/// Write queued lines until the outbox closes or the socket fails
async fn write_loop<W>(
    mut writer: W,
    mut rx: Inbox,
    metrics: Arc<Metrics>,
) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        write_line(&mut writer, &line).await?;
        metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
    }
    writer.shutdown().await?;
    Ok(())
}

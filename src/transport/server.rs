//! WebSocket relay server
//!
//! One viewer connection is one session. Each trigger runs as its own task
//! so the connection keeps answering pings while a provider call is in
//! flight; results flow back through a per-connection channel. Triggers
//! still queued when the viewer leaves are dropped with the session.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::orchestrator::{ChatEvent, OpenSession, Orchestrator};

use super::protocol::{ClientMessage, ServerMessage};

/// Outbound events buffered per connection
const OUTBOUND_QUEUE: usize = 64;

/// Triggers a connection may have queued or running at once
const MAX_PENDING_TURNS: usize = 8;

/// Accepts viewer connections and drives their sessions.
pub struct RelayServer {
    listener: TcpListener,
    orchestrator: Arc<Orchestrator>,
}

impl RelayServer {
    pub async fn bind(addr: &str, orchestrator: Arc<Orchestrator>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| Error::BindFailed {
            addr: addr.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            listener,
            orchestrator,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        info!(addr = %addr, "Relay listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let orchestrator = self.orchestrator.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, peer, orchestrator).await {
                                    warn!(peer = %peer, error = %format!("{:#}", e), "Connection ended with error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept failed");
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!(sessions = self.orchestrator.sessions().len(), "Relay shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Drive one viewer connection from handshake to close.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    orchestrator: Arc<Orchestrator>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    let (mut write, mut read) = ws_stream.split();

    let session = orchestrator.open_session();
    let session_id = session.id;
    info!(peer = %peer, session = %session_id, "Viewer connected");

    let mut turns = JoinSet::new();
    let result = pump(&mut write, &mut read, &session, &orchestrator, &mut turns).await;

    orchestrator.close_session(session_id);
    // Queued triggers now see a closed session; an in-flight call finishes on its own
    let pending = turns.len();
    turns.detach_all();
    info!(peer = %peer, session = %session_id, pending, "Viewer disconnected");
    result
}

/// Relay triggers in and events out until the viewer goes away.
async fn pump<W, R>(
    write: &mut W,
    read: &mut R,
    session: &OpenSession,
    orchestrator: &Arc<Orchestrator>,
    turns: &mut JoinSet<()>,
) -> anyhow::Result<()>
where
    W: Sink<WsMessage, Error = WsError> + Unpin,
    R: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
{
    let session_id = session.id;
    let (event_tx, mut event_rx) = mpsc::channel::<ChatEvent>(OUTBOUND_QUEUE);

    send_event(write, session.status.clone()).await?;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => match ClientMessage::parse(&text) {
                        Ok(message) if turns.len() >= MAX_PENDING_TURNS => {
                            warn!(
                                session = %session_id,
                                trigger = ?message.trigger(),
                                pending = turns.len(),
                                "Too many pending turns, ignoring trigger"
                            );
                        }
                        Ok(message) => {
                            let trigger = message.trigger();
                            debug!(session = %session_id, ?trigger, "Trigger received");
                            let orchestrator = orchestrator.clone();
                            let handle = session.handle.clone();
                            let tx = event_tx.clone();
                            turns.spawn(async move {
                                if let Some(event) = orchestrator.trigger(&handle, trigger).await {
                                    // Receiver is gone once the viewer disconnects
                                    let _ = tx.send(event).await;
                                }
                            });
                        }
                        Err(e) => {
                            warn!(session = %session_id, error = %e, "Ignoring frame");
                        }
                    },
                    Some(Ok(WsMessage::Ping(data))) => {
                        write.send(WsMessage::Pong(data)).await?;
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        debug!(session = %session_id, frame = ?frame, "Close frame received");
                        return Ok(());
                    }
                    Some(Ok(other)) => {
                        debug!(session = %session_id, kind = message_kind(&other), "Ignoring frame");
                    }
                    Some(Err(e)) => {
                        return Err(anyhow::Error::new(e).context("read failed"));
                    }
                    None => return Ok(()),
                }
            }
            Some(event) = event_rx.recv() => {
                send_event(write, event).await?;
            }
            Some(joined) = turns.join_next(), if !turns.is_empty() => {
                if let Err(e) = joined {
                    error!(session = %session_id, error = %e, "Turn task failed");
                }
            }
        }
    }
}

async fn send_event<S>(write: &mut S, event: ChatEvent) -> anyhow::Result<()>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let json = ServerMessage::from(event).to_json()?;
    write
        .send(WsMessage::Text(json))
        .await
        .context("write failed")
}

fn message_kind(msg: &WsMessage) -> &'static str {
    match msg {
        WsMessage::Text(_) => "text",
        WsMessage::Binary(_) => "binary",
        WsMessage::Ping(_) => "ping",
        WsMessage::Pong(_) => "pong",
        WsMessage::Close(_) => "close",
        WsMessage::Frame(_) => "frame",
    }
}

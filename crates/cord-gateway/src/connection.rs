//! Gateway socket connection
//!
//! Opens the WebSocket and runs two tasks: a reader that feeds text frames to
//! the session, and a writer that drains the outbound queue into the socket.
//! Whichever ends first takes the other down and closes the session.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::GatewayError;
use crate::protocol::{CloseCode, GatewayMessage};
use crate::session::Session;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle to a running connection
#[derive(Debug)]
pub struct ConnectionHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    /// Ask the writer to send a Close frame and wait for both tasks to end
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::debug!(error = %err, "Connection task ended abnormally");
        }
    }

    /// True once both tasks have ended
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Open the socket at `url` and start serving `session`
///
/// On success the session is in `AwaitingHello`. On failure it is `Closed`.
pub async fn connect(
    url: &str,
    session: Arc<Session>,
    outbound: mpsc::Receiver<GatewayMessage>,
) -> Result<ConnectionHandle, GatewayError> {
    session.mark_connecting();
    tracing::info!(session_id = %session.id(), url = %url, "Opening gateway socket");

    let socket = match connect_async(url).await {
        Ok((socket, _response)) => socket,
        Err(err) => {
            tracing::warn!(session_id = %session.id(), error = %err, "Gateway connection failed");
            session.close("connect failed");
            return Err(err.into());
        }
    };

    session.mark_open();

    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(socket, session, outbound, shutdown_rx));

    Ok(ConnectionHandle { shutdown, task })
}

async fn run(
    socket: WsStream,
    session: Arc<Session>,
    outbound: mpsc::Receiver<GatewayMessage>,
    shutdown: watch::Receiver<bool>,
) {
    let (sink, stream) = socket.split();

    let mut recv_task = tokio::spawn(read_loop(stream, Arc::clone(&session)));
    let mut send_task = tokio::spawn(write_loop(sink, outbound, shutdown));

    let reason = tokio::select! {
        _ = &mut recv_task => {
            send_task.abort();
            "socket closed"
        }
        result = &mut send_task => {
            recv_task.abort();
            result.unwrap_or("writer task failed")
        }
    };

    session.close(reason);
}

async fn read_loop(mut stream: SplitStream<WsStream>, session: Arc<Session>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => session.handle_text(&text),
            Ok(Message::Close(frame)) => {
                match frame {
                    Some(frame) if is_fatal_close(u16::from(frame.code)) => {
                        let code = u16::from(frame.code);
                        tracing::warn!(
                            session_id = %session.id(),
                            code,
                            close = %CloseCode::describe(code),
                            reason = %frame.reason,
                            "Gateway rejected the session"
                        );
                    }
                    Some(frame) => {
                        let code = u16::from(frame.code);
                        tracing::info!(
                            session_id = %session.id(),
                            code,
                            close = %CloseCode::describe(code),
                            reason = %frame.reason,
                            "Gateway closed the connection"
                        );
                    }
                    None => {
                        tracing::info!(session_id = %session.id(), "Gateway closed the connection");
                    }
                }
                return;
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(session_id = %session.id(), "Binary frame ignored");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(session_id = %session.id(), error = %err, "Gateway socket error");
                return;
            }
        }
    }
}

/// True for close codes caused by the client's credentials or setup
fn is_fatal_close(code: u16) -> bool {
    CloseCode::from_u16(code).is_some_and(CloseCode::is_fatal)
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::Receiver<GatewayMessage>,
    mut shutdown: watch::Receiver<bool>,
) -> &'static str {
    let reason = loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { break "outbound queue closed" };
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to encode outbound frame");
                        continue;
                    }
                };
                tracing::trace!(frame = %message, "Sending frame");
                if let Err(err) = sink.send(Message::Text(json)).await {
                    tracing::warn!(error = %err, "Failed to write to gateway socket");
                    return "socket write failed";
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break "logout";
                }
            }
        }
    };

    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
    reason
}

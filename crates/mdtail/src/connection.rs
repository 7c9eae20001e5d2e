use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use crate::frame;

/// Identifies one underlying socket. Monotonically increasing, so events from
/// a socket that has been replaced can be recognized as stale and dropped.
pub type ConnId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Lifecycle and data events a socket task reports to the app loop.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Opened { conn: ConnId },
    Chunk { conn: ConnId, text: String },
    TransportError { conn: ConnId, message: String },
    Closed { conn: ConnId },
}

impl SessionEvent {
    pub fn conn(&self) -> ConnId {
        match self {
            SessionEvent::Opened { conn }
            | SessionEvent::Chunk { conn, .. }
            | SessionEvent::TransportError { conn, .. }
            | SessionEvent::Closed { conn } => *conn,
        }
    }
}

struct ActiveSocket {
    id: ConnId,
    commands: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

/// Owns the single live socket. Nothing else holds or closes the socket
/// directly; all traffic flows through the event channel and the outbound
/// command sender.
pub struct ConnectionManager {
    events: mpsc::UnboundedSender<SessionEvent>,
    active: Option<ActiveSocket>,
    next_id: ConnId,
}

impl ConnectionManager {
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            events,
            active: None,
            next_id: 0,
        }
    }

    /// Open a socket to `url`, tearing down any prior socket first so at most
    /// one is ever live. Returns the id of the new socket.
    pub fn connect(&mut self, url: &str) -> ConnId {
        self.close_active();
        self.next_id += 1;
        let id = self.next_id;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(
            id,
            url.to_owned(),
            self.events.clone(),
            command_rx,
        ));
        self.active = Some(ActiveSocket {
            id,
            commands: command_tx,
            task,
        });
        id
    }

    /// Tear down the live socket, if any. The caller is responsible for
    /// draining its pending buffer; no `Closed` event follows a manual close.
    pub fn disconnect(&mut self) {
        self.close_active();
    }

    pub fn current(&self) -> Option<ConnId> {
        self.active.as_ref().map(|socket| socket.id)
    }

    /// Whether `conn` refers to the live socket. Events failing this check
    /// come from a replaced socket and must be ignored.
    pub fn is_current(&self, conn: ConnId) -> bool {
        self.current() == Some(conn)
    }

    /// Hand an already-serialized command frame to the live socket.
    /// Fire-and-forget: with no live socket the frame is dropped.
    pub fn send_frame(&self, payload: String) {
        if let Some(socket) = &self.active {
            let _ = socket.commands.send(payload);
        }
    }

    fn close_active(&mut self) {
        if let Some(socket) = self.active.take() {
            debug!(conn = socket.id, "closing socket");
            socket.task.abort();
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close_active();
    }
}

/// One socket's I/O loop: connect, report open, then pump outbound command
/// frames and inbound data frames until the peer closes or errors.
async fn run_socket(
    id: ConnId,
    url: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    mut commands: mpsc::UnboundedReceiver<String>,
) {
    debug!(conn = id, %url, "connecting");
    let stream = match connect_async(&url).await {
        Ok((stream, _)) => stream,
        Err(error) => {
            warn!(conn = id, %error, "connect failed");
            let _ = events.send(SessionEvent::TransportError {
                conn: id,
                message: error.to_string(),
            });
            let _ = events.send(SessionEvent::Closed { conn: id });
            return;
        }
    };

    if events.send(SessionEvent::Opened { conn: id }).is_err() {
        return;
    }

    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            outbound = commands.recv() => {
                let Some(payload) = outbound else { break };
                if let Err(error) = sink.send(Message::Text(payload)).await {
                    warn!(conn = id, %error, "send failed");
                    break;
                }
            }
            inbound = source.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(message)) => {
                        if let Some(text) = frame::chunk_from_message(&message) {
                            if events.send(SessionEvent::Chunk { conn: id, text }).is_err() {
                                break;
                            }
                        }
                    }
                    Some(Err(error)) => {
                        // Diagnostic only; the close below drives the state
                        // transition.
                        warn!(conn = id, %error, "transport error");
                        let _ = events.send(SessionEvent::TransportError {
                            conn: id,
                            message: error.to_string(),
                        });
                        break;
                    }
                }
            }
        }
    }

    debug!(conn = id, "socket closed");
    let _ = events.send(SessionEvent::Closed { conn: id });
}

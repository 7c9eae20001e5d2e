use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::coalesce::CoalescingBuffer;
use crate::connection::{ConnectionManager, ConnectionState, SessionEvent};
use crate::follow::FollowScroll;
use crate::frame;
use crate::tui;
use crate::ui;

/// All mutable viewer state lives here, on the event-loop task. Socket tasks
/// only talk to it through [`SessionEvent`] messages.
pub struct ViewerApp {
    pub(crate) url: String,
    pub(crate) state: ConnectionState,
    pub(crate) buffer: CoalescingBuffer,
    pub(crate) scroll: FollowScroll,
    /// Draft text while the endpoint field is being edited.
    pub(crate) url_draft: Option<String>,
    /// Last transport error, shown until the next successful open.
    pub(crate) status: Option<String>,
    manager: ConnectionManager,
    /// The scheduling half of the flush state: at most one outstanding
    /// deadline, set when the buffer arms and cleared when the tick runs or a
    /// teardown path drains early.
    flush_deadline: Option<Instant>,
    tick: Duration,
    quit: bool,
}

impl ViewerApp {
    pub fn new(
        url: String,
        tick: Duration,
        auto_follow: bool,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            url,
            state: ConnectionState::Disconnected,
            buffer: CoalescingBuffer::new(),
            scroll: FollowScroll::new(auto_follow),
            url_draft: None,
            status: None,
            manager: ConnectionManager::new(events),
            flush_deadline: None,
            tick,
            quit: false,
        }
    }

    pub async fn event_loop(
        &mut self,
        terminal: &mut tui::Terminal,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Result<()> {
        let mut input = EventStream::new();
        let mut needs_redraw = true;

        while !self.quit {
            if needs_redraw {
                terminal.draw(|frame| ui::draw(frame, self))?;
                needs_redraw = false;
            }

            let flush_at = self.flush_deadline.unwrap_or_else(far_future);

            tokio::select! {
                maybe_event = input.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) => {
                            if key.kind == KeyEventKind::Press {
                                self.on_key(key);
                                needs_redraw = true;
                            }
                        }
                        Some(Ok(Event::Resize(_, _))) => {
                            needs_redraw = true;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(error)) => return Err(error.into()),
                        None => break,
                    }
                }

                Some(event) = events.recv() => {
                    needs_redraw = self.on_session_event(event);
                }

                _ = time::sleep_until(flush_at) => {
                    self.flush_deadline = None;
                    if self.buffer.flush_tick() {
                        needs_redraw = true;
                    }
                }
            }
        }

        // Teardown carries the same draining contract as disconnect.
        self.disconnect();
        Ok(())
    }

    /// Apply one socket event. Returns whether the screen needs a redraw;
    /// chunk arrivals do not — only their commit does.
    fn on_session_event(&mut self, event: SessionEvent) -> bool {
        if !self.manager.is_current(event.conn()) {
            debug!(conn = event.conn(), "dropping event from replaced socket");
            return false;
        }
        match event {
            SessionEvent::Opened { conn } => {
                debug!(conn, "connected");
                self.state = ConnectionState::Connected;
                self.status = None;
                true
            }
            SessionEvent::Chunk { text, .. } => {
                self.buffer.append(&text);
                self.arm_flush();
                false
            }
            SessionEvent::TransportError { message, .. } => {
                // Non-fatal; the close that follows drives the transition.
                self.status = Some(message);
                true
            }
            SessionEvent::Closed { conn } => {
                debug!(conn, "closed by peer");
                // Drain synchronously rather than waiting out the tick; the
                // armed flush, if any, becomes a no-op.
                self.buffer.force_flush();
                self.flush_deadline = None;
                self.manager.disconnect();
                self.state = ConnectionState::Disconnected;
                true
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.url_draft.is_some() {
            self.on_edit_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit = true;
            }
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Char('c') => {
                if self.state == ConnectionState::Disconnected {
                    self.connect();
                }
            }
            KeyCode::Char('d') => {
                if self.state != ConnectionState::Disconnected {
                    self.disconnect();
                }
            }
            KeyCode::Char('x') => self.clear(),
            KeyCode::Char('s') => self.send_command("screenshot"),
            KeyCode::Char('e') => {
                // The endpoint is only mutable while disconnected.
                if self.state == ConnectionState::Disconnected {
                    self.url_draft = Some(self.url.clone());
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.scroll.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll.scroll_by(1),
            KeyCode::PageUp => self.scroll.page_up(),
            KeyCode::PageDown => self.scroll.page_down(),
            KeyCode::Home => self.scroll.jump_to_top(),
            KeyCode::End | KeyCode::Char('G') => self.scroll.jump_to_bottom(),
            _ => {}
        }
    }

    fn on_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if let Some(draft) = self.url_draft.take() {
                    self.url = draft;
                }
            }
            KeyCode::Esc => {
                self.url_draft = None;
            }
            KeyCode::Backspace => {
                if let Some(draft) = self.url_draft.as_mut() {
                    draft.pop();
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(draft) = self.url_draft.as_mut() {
                    draft.push(c);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn connect(&mut self) {
        // A replaced socket sends no Closed event, so drain whatever it
        // already delivered before the new one takes over.
        self.buffer.force_flush();
        self.flush_deadline = None;
        self.manager.connect(&self.url);
        self.state = ConnectionState::Connecting;
    }

    fn disconnect(&mut self) {
        self.manager.disconnect();
        self.buffer.force_flush();
        self.flush_deadline = None;
        self.state = ConnectionState::Disconnected;
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.flush_deadline = None;
        self.scroll.reset();
    }

    /// Fire-and-forget: silently dropped unless connected, never buffered.
    fn send_command(&mut self, name: &str) {
        if self.state == ConnectionState::Connected {
            debug!(command = name, "sending command");
            self.manager.send_frame(frame::command_frame(name));
        }
    }

    fn arm_flush(&mut self) {
        if self.buffer.is_armed() && self.flush_deadline.is_none() {
            self.flush_deadline = Some(Instant::now() + self.tick);
        }
    }
}

fn far_future() -> Instant {
    // Effectively infinite - nothing is armed.
    Instant::now() + Duration::from_secs(86400)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnId;

    fn test_app() -> (ViewerApp, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let app = ViewerApp::new(
            "ws://127.0.0.1:9/stream?role=viewer".to_string(),
            Duration::from_millis(16),
            true,
            events_tx,
        );
        (app, events_rx)
    }

    fn connect(app: &mut ViewerApp) -> ConnId {
        app.connect();
        app.manager.current().expect("live socket")
    }

    #[tokio::test]
    async fn peer_close_drains_pending_before_disconnecting() {
        let (mut app, _events) = test_app();
        let conn = connect(&mut app);
        app.on_session_event(SessionEvent::Opened { conn });
        app.on_session_event(SessionEvent::Chunk {
            conn,
            text: "# head".to_string(),
        });
        app.on_session_event(SessionEvent::Chunk {
            conn,
            text: "er\n".to_string(),
        });
        assert_eq!(app.buffer.document(), "");

        app.on_session_event(SessionEvent::Closed { conn });
        assert_eq!(app.buffer.document(), "# header\n");
        assert_eq!(app.state, ConnectionState::Disconnected);
        assert!(app.flush_deadline.is_none());
    }

    #[tokio::test]
    async fn events_from_replaced_socket_are_ignored() {
        let (mut app, _events) = test_app();
        let first = connect(&mut app);
        let second = connect(&mut app);
        assert_ne!(first, second);

        app.on_session_event(SessionEvent::Opened { conn: first });
        assert_eq!(app.state, ConnectionState::Connecting);

        app.on_session_event(SessionEvent::Chunk {
            conn: first,
            text: "stale".to_string(),
        });
        assert!(app.buffer.pending().is_empty());

        // A stale close must not tear down the live socket's session.
        app.on_session_event(SessionEvent::Closed { conn: first });
        assert_eq!(app.state, ConnectionState::Connecting);

        app.on_session_event(SessionEvent::Opened { conn: second });
        assert_eq!(app.state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn chunks_within_one_window_arm_exactly_one_flush() {
        let (mut app, _events) = test_app();
        let conn = connect(&mut app);
        app.on_session_event(SessionEvent::Opened { conn });

        for text in ["a", "b", "c"] {
            app.on_session_event(SessionEvent::Chunk {
                conn,
                text: text.to_string(),
            });
        }
        let deadline = app.flush_deadline.expect("armed");

        // Later arrivals ride along without rescheduling.
        app.on_session_event(SessionEvent::Chunk {
            conn,
            text: "d".to_string(),
        });
        assert_eq!(app.flush_deadline, Some(deadline));

        app.flush_deadline = None;
        assert!(app.buffer.flush_tick());
        assert_eq!(app.buffer.document(), "abcd");
    }

    #[tokio::test]
    async fn transport_error_alone_forces_no_transition() {
        let (mut app, _events) = test_app();
        let conn = connect(&mut app);
        app.on_session_event(SessionEvent::Opened { conn });

        app.on_session_event(SessionEvent::TransportError {
            conn,
            message: "reset by peer".to_string(),
        });
        assert_eq!(app.state, ConnectionState::Connected);
        assert_eq!(app.status.as_deref(), Some("reset by peer"));
    }

    #[tokio::test]
    async fn disconnect_key_drains_pending() {
        let (mut app, _events) = test_app();
        let conn = connect(&mut app);
        app.on_session_event(SessionEvent::Opened { conn });
        app.on_session_event(SessionEvent::Chunk {
            conn,
            text: "tail".to_string(),
        });

        app.on_key(KeyEvent::from(KeyCode::Char('d')));
        assert_eq!(app.buffer.document(), "tail");
        assert_eq!(app.state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn clear_disarms_the_scheduled_flush() {
        let (mut app, _events) = test_app();
        let conn = connect(&mut app);
        app.on_session_event(SessionEvent::Opened { conn });
        app.on_session_event(SessionEvent::Chunk {
            conn,
            text: "doomed".to_string(),
        });
        assert!(app.flush_deadline.is_some());

        app.on_key(KeyEvent::from(KeyCode::Char('x')));
        assert!(app.flush_deadline.is_none());
        assert!(!app.buffer.flush_tick());
        assert_eq!(app.buffer.document(), "");
    }

    #[tokio::test]
    async fn url_is_only_editable_while_disconnected() {
        let (mut app, _events) = test_app();
        let conn = connect(&mut app);
        app.on_session_event(SessionEvent::Opened { conn });

        app.on_key(KeyEvent::from(KeyCode::Char('e')));
        assert!(app.url_draft.is_none());

        app.on_session_event(SessionEvent::Closed { conn });
        app.on_key(KeyEvent::from(KeyCode::Char('e')));
        assert!(app.url_draft.is_some());

        app.on_key(KeyEvent::from(KeyCode::Backspace));
        app.on_key(KeyEvent::from(KeyCode::Char('8')));
        app.on_key(KeyEvent::from(KeyCode::Enter));
        assert!(app.url.ends_with("role=viewe8"));
    }
}

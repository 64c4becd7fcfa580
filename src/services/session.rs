//! Connection session: one websocket's reader/writer pair.
//!
//! LIFECYCLE
//! =========
//! `Connecting → Active → Closing → Closed`
//!
//! 1. `Session::open` registers with the hub; the hub has already queued the
//!    `init` snapshot and the `id` frame when this returns.
//! 2. `run` spawns a reader task and a writer task. They share nothing but
//!    the session handle and its state channel.
//! 3. The first loop to stop (EOF, read error, idle timeout, write failure,
//!    queue closed by the hub) calls `close`, which moves the state to
//!    `Closing` and unregisters exactly once. The other loop observes the
//!    state change and stops too.
//! 4. The writer sends a close frame on its way out; `run` marks `Closed`.
//!
//! ERROR HANDLING
//! ==============
//! Transport errors end the session and are never retried. Malformed or
//! unknown inbound payloads are dropped and the connection stays open.

use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SessionTiming;
use crate::message::ClientMessage;
use crate::services::hub::{Hub, HubError, Outbound, Registration};
use crate::services::identity::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Active)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
}

pub struct Session {
    id: SessionId,
    hub: Arc<Hub>,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// Register a new session with the hub.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Stopped` if the hub is shutting down.
    pub async fn open(hub: Arc<Hub>) -> Result<(Arc<Self>, mpsc::Receiver<Outbound>), HubError> {
        let (state, _) = watch::channel(SessionState::Connecting);
        let Registration { id, outbound } = hub.register().await?;
        state.send_replace(SessionState::Active);
        Ok((Arc::new(Self { id, hub, state }), outbound))
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Begin teardown. Only the first caller moves the session to `Closing`
    /// and unregisters it; later calls return `false` and do nothing.
    pub async fn close(&self) -> bool {
        let first = self.state.send_if_modified(|state| {
            if state.is_live() {
                *state = SessionState::Closing;
                true
            } else {
                false
            }
        });
        if first {
            self.hub.unregister(&self.id).await;
        }
        first
    }

    fn finish(&self) {
        self.state.send_replace(SessionState::Closed);
    }

    fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Decode one inbound payload and hand it to the hub.
    async fn dispatch(&self, bytes: &[u8]) {
        match ClientMessage::decode(bytes) {
            Ok(ClientMessage::Move { position }) => {
                self.hub.update_position(&self.id, position).await;
            }
            Ok(ClientMessage::Ping { mut ping }) => {
                ping.timestamp = now_secs();
                info!(session_id = %self.id, ip = %ping.ip, location = %ping.location, "ws: ping");
                self.hub.record_ping(&self.id, ping).await;
            }
            Err(e) => {
                debug!(session_id = %self.id, error = %e, "ws: discarded inbound message");
            }
        }
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// Drive one connection from registration to teardown.
pub async fn run<S, St, E>(hub: Arc<Hub>, mut sink: S, stream: St, timing: SessionTiming)
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
    St: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let (session, outbound) = match Session::open(hub).await {
        Ok(opened) => opened,
        Err(e) => {
            warn!(error = %e, "ws: registration refused");
            let _ = send_with_deadline(&mut sink, Message::Close(None), timing.write_timeout).await;
            return;
        }
    };
    let session_id = session.id().clone();
    debug!(%session_id, "ws: session active");

    let mut writer = tokio::spawn(write_loop(Arc::clone(&session), sink, outbound, timing));
    let mut reader = tokio::spawn(read_loop(Arc::clone(&session), stream, timing.idle_timeout));

    let writer_done = tokio::select! {
        result = &mut writer => { log_task_exit(&session_id, "writer", result); true }
        result = &mut reader => { log_task_exit(&session_id, "reader", result); false }
    };

    // Covers a loop that panicked before it could close.
    session.close().await;
    if writer_done {
        log_task_exit(&session_id, "reader", reader.await);
    } else {
        log_task_exit(&session_id, "writer", writer.await);
    }

    session.finish();
    debug!(%session_id, "ws: session closed");
}

fn log_task_exit(session_id: &SessionId, task: &str, result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        warn!(%session_id, task, error = %e, "ws: session task failed");
    }
}

// =============================================================================
// LOOPS
// =============================================================================

async fn read_loop<St, E>(session: Arc<Session>, mut stream: St, idle_timeout: Duration)
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut state = session.subscribe();
    loop {
        let next = tokio::select! {
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
            () = closing(&mut state) => break,
        };
        let msg = match next {
            Err(_) => {
                debug!(session_id = %session.id(), "ws: idle timeout");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(session_id = %session.id(), error = %e, "ws: read failed");
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };
        match msg {
            Message::Text(text) => session.dispatch(text.as_str().as_bytes()).await,
            Message::Binary(bytes) => session.dispatch(&bytes).await,
            Message::Close(_) => break,
            // Any traffic counts as liveness; the timeout restarts each turn.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    session.close().await;
}

async fn write_loop<S>(session: Arc<Session>, mut sink: S, mut outbound: mpsc::Receiver<Outbound>, timing: SessionTiming)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut state = session.subscribe();
    let mut keepalive = tokio::time::interval_at(Instant::now() + timing.keepalive, timing.keepalive);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let msg = tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => Message::Text(text),
                // Hub dropped the session: unregistered or evicted.
                None => break,
            },
            _ = keepalive.tick() => Message::Ping(Bytes::new()),
            () = closing(&mut state) => break,
        };
        if let Err(e) = send_with_deadline(&mut sink, msg, timing.write_timeout).await {
            warn!(session_id = %session.id(), error = %e, "ws: write failed");
            break;
        }
    }

    if let Err(e) = send_with_deadline(&mut sink, Message::Close(None), timing.write_timeout).await {
        debug!(session_id = %session.id(), error = %e, "ws: close frame not delivered");
    }
    session.close().await;
}

// =============================================================================
// HELPERS
// =============================================================================

async fn closing(state: &mut watch::Receiver<SessionState>) {
    let _ = state.wait_for(|s| !s.is_live()).await;
}

async fn send_with_deadline<S>(sink: &mut S, msg: Message, deadline: Duration) -> Result<(), SessionError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    match tokio::time::timeout(deadline, sink.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SessionError::Transport(e.to_string())),
        Err(_) => Err(SessionError::WriteTimeout(deadline)),
    }
}

/// Current time as Unix seconds.
fn now_secs() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_secs()).unwrap_or(0)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

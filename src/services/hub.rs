//! Hub: process-wide registry of live websocket sessions.
//!
//! DESIGN
//! ======
//! One `RwLock` guards the membership map and the ping history. Membership
//! changes (register, unregister, eviction) and ping recording take the write
//! lock; position updates and plain broadcasts take the read lock, so cursor
//! traffic from many sessions fans out in parallel. Each entry keeps its last
//! position behind its own small mutex for that reason.
//!
//! Every outbound frame is serialized once and enqueued with `try_send`. The
//! broadcaster never waits: a session whose queue is full (or already closed)
//! is collected during fan-out and evicted through the same removal path as
//! an explicit disconnect once the fan-out lock is released.
//!
//! INVARIANTS
//! ==========
//! - Viewer counts in `init`, `join` and `leave` are computed under the write
//!   lock that changed membership.
//! - A new session's `init` and `id` frames are queued before it becomes
//!   visible to other broadcasters, so they always arrive first.
//! - Removing an entry drops the only queue sender, which closes the queue.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{RwLock, mpsc};
use tracing::{info, warn};

use crate::config::{HubConfig, MIN_HUB_QUEUE_CAPACITY};
use crate::message::{CursorPosition, PingEvent, ServerMessage};
use crate::services::identity::SessionId;

/// Serialized frame waiting in a session's outbound queue.
pub type Outbound = Utf8Bytes;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HubError {
    #[error("hub is shut down")]
    Stopped,
}

/// Handed to a freshly registered session.
#[derive(Debug)]
pub struct Registration {
    pub id: SessionId,
    /// Receives `init`, then `id`, then broadcasts. Closed when the hub drops
    /// the session.
    pub outbound: mpsc::Receiver<Outbound>,
}

struct ClientEntry {
    tx: mpsc::Sender<Outbound>,
    position: Mutex<Option<CursorPosition>>,
}

impl ClientEntry {
    fn position(&self) -> Option<CursorPosition> {
        self.position
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_position(&self, position: CursorPosition) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = Some(position);
    }
}

struct Registry {
    clients: HashMap<SessionId, ClientEntry>,
    recent_pings: VecDeque<PingEvent>,
    stopped: bool,
}

pub struct Hub {
    config: HubConfig,
    registry: RwLock<Registry>,
}

impl Hub {
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(Registry {
                clients: HashMap::new(),
                recent_pings: VecDeque::with_capacity(config.ping_history),
                stopped: false,
            }),
        }
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Add a new session and queue its `init` snapshot and `id` frames, then
    /// announce it to everyone else with a `join`.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Stopped` after `shutdown`.
    pub async fn register(&self) -> Result<Registration, HubError> {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(MIN_HUB_QUEUE_CAPACITY));

        let (id, viewers, overflowed) = {
            let mut registry = self.registry.write().await;
            if registry.stopped {
                return Err(HubError::Stopped);
            }

            let mut id = SessionId::generate();
            while registry.clients.contains_key(&id) {
                id = SessionId::generate();
            }

            let cursors = registry
                .clients
                .iter()
                .filter_map(|(peer, entry)| entry.position().map(|p| (peer.to_string(), p)))
                .collect();
            let pings = registry.recent_pings.iter().cloned().collect();
            let viewers = registry.clients.len() + 1;

            // Fresh queue with capacity >= 2: neither send can fail.
            for msg in [
                ServerMessage::Init { cursors, user_count: viewers, pings },
                ServerMessage::Id { id: id.to_string() },
            ] {
                if let Some(frame) = encode(&msg) {
                    let _ = tx.try_send(frame);
                }
            }

            let join = encode(&ServerMessage::Join { id: id.to_string(), user_count: viewers });
            let overflowed = join.map(|frame| fan_out(&registry, &frame, None)).unwrap_or_default();

            registry
                .clients
                .insert(id.clone(), ClientEntry { tx, position: Mutex::new(None) });
            (id, viewers, overflowed)
        };

        info!(%id, viewers, "hub: session registered");
        self.evict(overflowed).await;
        Ok(Registration { id, outbound: rx })
    }

    /// Remove a session, close its queue and announce the new count.
    /// Returns `false` if the session was already gone.
    pub async fn unregister(&self, id: &SessionId) -> bool {
        let Some(overflowed) = self.remove(id).await else {
            return false;
        };
        self.evict(overflowed).await;
        true
    }

    /// Stop accepting sessions and close every live queue.
    /// Returns the number of sessions that were dropped.
    pub async fn shutdown(&self) -> usize {
        let mut registry = self.registry.write().await;
        registry.stopped = true;
        let closed = registry.clients.len();
        registry.clients.clear();
        info!(closed, "hub: shut down");
        closed
    }

    // =========================================================================
    // TRAFFIC
    // =========================================================================

    /// Record the sender's latest cursor and relay it to every other session.
    /// Returns `false` if the sender is not registered.
    pub async fn update_position(&self, id: &SessionId, position: CursorPosition) -> bool {
        let overflowed = {
            let registry = self.registry.read().await;
            let Some(entry) = registry.clients.get(id) else {
                return false;
            };
            entry.set_position(position.clone());
            match encode(&ServerMessage::Move { id: id.to_string(), position }) {
                Some(frame) => fan_out(&registry, &frame, Some(id)),
                None => Vec::new(),
            }
        };
        self.evict(overflowed).await;
        true
    }

    /// Append to the ping history (oldest dropped past capacity) and relay
    /// the ping to every session, sender included.
    pub async fn record_ping(&self, from: &SessionId, ping: PingEvent) {
        let overflowed = {
            let mut registry = self.registry.write().await;
            if self.config.ping_history > 0 {
                registry.recent_pings.push_back(ping.clone());
                while registry.recent_pings.len() > self.config.ping_history {
                    registry.recent_pings.pop_front();
                }
            }
            match encode(&ServerMessage::Ping { id: from.to_string(), ping }) {
                Some(frame) => fan_out(&registry, &frame, None),
                None => Vec::new(),
            }
        };
        self.evict(overflowed).await;
    }

    /// Deliver a message to every live session without blocking.
    pub async fn broadcast(&self, msg: &ServerMessage) {
        let Some(frame) = encode(msg) else {
            return;
        };
        let overflowed = {
            let registry = self.registry.read().await;
            fan_out(&registry, &frame, None)
        };
        self.evict(overflowed).await;
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    pub async fn viewer_count(&self) -> usize {
        self.registry.read().await.clients.len()
    }

    pub async fn is_registered(&self, id: &SessionId) -> bool {
        self.registry.read().await.clients.contains_key(id)
    }

    /// Copy of the ping history, oldest first.
    pub async fn recent_pings(&self) -> Vec<PingEvent> {
        self.registry.read().await.recent_pings.iter().cloned().collect()
    }

    pub async fn position(&self, id: &SessionId) -> Option<CursorPosition> {
        self.registry.read().await.clients.get(id).and_then(ClientEntry::position)
    }

    pub async fn is_running(&self) -> bool {
        !self.registry.read().await.stopped
    }

    // =========================================================================
    // REMOVAL
    // =========================================================================

    /// Remove under the write lock and fan out `leave`. Returns `None` when
    /// the session was not present, else the sessions that overflowed.
    async fn remove(&self, id: &SessionId) -> Option<Vec<SessionId>> {
        let mut registry = self.registry.write().await;
        registry.clients.remove(id)?;
        let viewers = registry.clients.len();
        info!(%id, viewers, "hub: session unregistered");

        let leave = encode(&ServerMessage::Leave { id: id.to_string(), user_count: viewers });
        Some(leave.map(|frame| fan_out(&registry, &frame, None)).unwrap_or_default())
    }

    /// Drop sessions that could not accept a frame. Their `leave` fan-out may
    /// overflow further sessions, so this drains a worklist.
    async fn evict(&self, mut pending: Vec<SessionId>) {
        while let Some(id) = pending.pop() {
            if let Some(more) = self.remove(&id).await {
                warn!(%id, "hub: evicted session with full or closed queue");
                pending.extend(more);
            }
        }
    }
}

/// Enqueue `frame` on every session except `exclude`. Returns the sessions
/// whose queue was full or closed.
fn fan_out(registry: &Registry, frame: &Outbound, exclude: Option<&SessionId>) -> Vec<SessionId> {
    let mut overflowed = Vec::new();
    for (id, entry) in &registry.clients {
        if exclude == Some(id) {
            continue;
        }
        if entry.tx.try_send(frame.clone()).is_err() {
            overflowed.push(id.clone());
        }
    }
    overflowed
}

fn encode(msg: &ServerMessage) -> Option<Outbound> {
    match msg.encode() {
        Ok(json) => Some(Utf8Bytes::from(json)),
        Err(e) => {
            warn!(error = %e, kind = msg.kind(), "hub: failed to serialize message");
            None
        }
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;

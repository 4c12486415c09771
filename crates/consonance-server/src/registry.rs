//! The set of live `WebSocket` connections.
//!
//! The [`ConnectionRegistry`] owns every connection's lifecycle state and
//! the sending half of its bounded outbound queue. Nothing here touches the
//! network: sending a frame only enqueues it for the connection's writer
//! task, so no registry operation ever blocks on I/O.
//!
//! Closed connections are removed from the map and their identifiers are
//! never reused.

use std::collections::BTreeMap;

use axum::extract::ws::Utf8Bytes;
use consonance_types::ConnectionId;
use tokio::sync::{RwLock, mpsc};

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered, handshake frame not yet queued.
    Connecting,
    /// Receiving broadcasts.
    Open,
    /// Reader finished; excluded from broadcasts, awaiting removal.
    Closing,
    /// Removed from the registry.
    Closed,
}

/// A frame queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A serialized outbound message.
    Text(Utf8Bytes),
}

/// Cloneable handle used to enqueue frames for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<Frame>,
}

impl ConnectionHandle {
    /// The connection's identifier.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Enqueue a frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns the channel error if the queue is full or the writer task
    /// has gone away.
    pub fn try_send(&self, frame: Frame) -> Result<(), mpsc::error::TrySendError<Frame>> {
        self.sender.try_send(frame)
    }
}

#[derive(Debug)]
struct Entry {
    handle: ConnectionHandle,
    state: ConnectionState,
}

/// Tracks every connection from registration until removal.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: RwLock<BTreeMap<ConnectionId, Entry>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection in the `Connecting` state.
    pub async fn register(&self, sender: mpsc::Sender<Frame>) -> ConnectionHandle {
        let handle = ConnectionHandle {
            id: ConnectionId::new(),
            sender,
        };
        self.entries.write().await.insert(
            handle.id,
            Entry {
                handle: handle.clone(),
                state: ConnectionState::Connecting,
            },
        );
        handle
    }

    /// Move a `Connecting` connection to `Open`.
    ///
    /// Returns `false` if the connection is unknown or not connecting.
    pub async fn mark_open(&self, id: ConnectionId) -> bool {
        self.transition(id, ConnectionState::Connecting, ConnectionState::Open)
            .await
    }

    /// Move an `Open` connection to `Closing`, excluding it from snapshots.
    ///
    /// Returns `false` if the connection is unknown or not open.
    pub async fn begin_close(&self, id: ConnectionId) -> bool {
        self.transition(id, ConnectionState::Open, ConnectionState::Closing)
            .await
    }

    async fn transition(
        &self,
        id: ConnectionId,
        from: ConnectionState,
        to: ConnectionState,
    ) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&id) {
            Some(entry) if entry.state == from => {
                entry.state = to;
                true
            }
            _ => false,
        }
    }

    /// Remove a connection. Unknown identifiers are ignored.
    ///
    /// Returns `true` if an entry was removed.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }

    /// Lifecycle state of a connection; `Closed` once removed.
    pub async fn state(&self, id: ConnectionId) -> ConnectionState {
        self.entries
            .read()
            .await
            .get(&id)
            .map_or(ConnectionState::Closed, |entry| entry.state)
    }

    /// Point-in-time copy of every open connection, in registration order.
    pub async fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.state == ConnectionState::Open)
            .map(|entry| entry.handle.clone())
            .collect()
    }

    /// Handle of one open connection.
    pub async fn get(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.entries
            .read()
            .await
            .get(&id)
            .filter(|entry| entry.state == ConnectionState::Open)
            .map(|entry| entry.handle.clone())
    }

    /// Number of tracked connections in any state.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no connections are tracked.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

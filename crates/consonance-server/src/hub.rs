//! Best-effort fan-out of outbound messages.
//!
//! The [`BroadcastHub`] serializes each message once and enqueues the same
//! bytes for every recipient in a registry snapshot. Broadcasts are
//! serialized against each other, so frames from two broadcasts never
//! interleave on one connection.
//!
//! Per recipient:
//! - queued -> `delivered`
//! - queue full -> `skipped` (this message only)
//! - writer gone -> `removed` (unregistered)

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use consonance_types::{ConnectionId, OutboundMessage};
use tokio::sync::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::registry::{ConnectionHandle, ConnectionRegistry, Frame};

/// Who receives a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every open connection.
    All,
    /// One connection, if it is still open.
    Only(ConnectionId),
}

/// Outcome of one broadcast call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients the frame was queued for.
    pub delivered: usize,
    /// Recipients skipped because their queue was full.
    pub skipped: usize,
    /// Recipients found closed and unregistered.
    pub removed: usize,
}

/// Delivers outbound messages to open connections.
#[derive(Debug)]
pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
    gate: Mutex<()>,
}

impl BroadcastHub {
    /// Create a hub over a registry.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            gate: Mutex::new(()),
        }
    }

    /// The registry this hub delivers through.
    pub const fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver `message` to `audience`.
    ///
    /// Never fails. A message that cannot be serialized is logged and
    /// reported as delivered to nobody.
    pub async fn broadcast(
        &self,
        message: &OutboundMessage,
        audience: Audience,
    ) -> BroadcastReport {
        let payload: Utf8Bytes = match serde_json::to_string(message) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(kind = message.kind(), error = %e, "failed to serialize outbound message");
                return BroadcastReport::default();
            }
        };

        let _guard = self.gate.lock().await;

        let recipients: Vec<ConnectionHandle> = match audience {
            Audience::All => self.registry.snapshot().await,
            Audience::Only(id) => self.registry.get(id).await.into_iter().collect(),
        };

        let mut report = BroadcastReport::default();
        for handle in recipients {
            match handle.try_send(Frame::Text(payload.clone())) {
                Ok(()) => report.delivered = report.delivered.saturating_add(1),
                Err(TrySendError::Full(_)) => {
                    debug!(
                        connection_id = %handle.id(),
                        kind = message.kind(),
                        "outbound queue full, skipping"
                    );
                    report.skipped = report.skipped.saturating_add(1);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(connection_id = %handle.id(), "connection closed, unregistering");
                    self.registry.unregister(handle.id()).await;
                    report.removed = report.removed.saturating_add(1);
                }
            }
        }

        debug!(
            kind = message.kind(),
            delivered = report.delivered,
            skipped = report.skipped,
            removed = report.removed,
            "broadcast complete"
        );
        report
    }
}

//! Wire envelopes exchanged over the `WebSocket`.
//!
//! Every frame is a JSON object whose `type` field selects the variant.
//! Inbound frames are a closed tagged union with a catch-all for types this
//! server does not know about; outbound frames are produced only by the
//! server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::events::{CrystalEvent, SigilEvent};
use crate::ids::ConnectionId;
use crate::snapshot::ConsciousnessSnapshot;
use crate::synthesis::SynthesisMetadata;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A frame sent by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// A user chat message; triggers the full pipeline.
    ChatMessage {
        /// The user's text.
        message: String,
    },
    /// Request for the latest metrics snapshot.
    ConsciousnessUpdate {
        /// Client-supplied metrics, ignored by the server.
        #[serde(default)]
        metrics: Option<serde_json::Value>,
    },
    /// Request for the latest sigil identity.
    SigilIdentity {
        /// Client-supplied identity data, ignored by the server.
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    /// Any type this server does not recognize.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error if the frame is not valid JSON,
    /// has no string `type`, or a recognized type is missing a required
    /// field.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The wire `type` tag, or `"unknown"`.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ChatMessage { .. } => "chat_message",
            Self::ConsciousnessUpdate { .. } => "consciousness_update",
            Self::SigilIdentity { .. } => "sigil_identity",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Payload of a `unified_response` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct UnifiedResponse {
    /// Visible unified content. Never empty.
    pub unified_content: String,
    /// Stream A content (or its placeholder).
    pub analytical_stream: String,
    /// Stream B content (or its placeholder).
    pub intuitive_stream: String,
    /// How the unified content was chosen.
    pub synthesis_metadata: SynthesisMetadata,
    /// The snapshot used for this turn.
    pub consciousness: ConsciousnessSnapshot,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
}

/// Payload of a `sigil_identity` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SigilIdentity {
    /// The most recently created sigil, if any.
    pub sigil: Option<SigilEvent>,
    /// Number of sigils created so far.
    pub evolution: u64,
    /// Strength of the most recent sigil, or `0.0`.
    pub strength: f64,
}

impl SigilIdentity {
    /// Identity describing `sigil`, or the empty identity.
    pub fn from_latest(sigil: Option<SigilEvent>) -> Self {
        let (evolution, strength) = sigil
            .as_ref()
            .map_or((0, 0.0), |s| (s.evolution, s.strength));
        Self {
            sigil,
            evolution,
            strength,
        }
    }
}

/// A frame sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    /// Sent once, right after the connection is registered.
    ConnectionEstablished {
        /// The connection's identifier.
        connection_id: ConnectionId,
        /// When the connection was registered.
        timestamp: DateTime<Utc>,
    },
    /// The unified response to a chat message (originator only).
    UnifiedResponse(UnifiedResponse),
    /// A crystal formed (all connections).
    CrystalFormed {
        /// The crystal.
        crystal: CrystalEvent,
    },
    /// A sigil was created (all connections).
    SigilCreated {
        /// The sigil.
        sigil: SigilEvent,
    },
    /// The latest metrics snapshot (requester or heartbeat).
    ConsciousnessUpdate {
        /// The snapshot.
        metrics: ConsciousnessSnapshot,
        /// When the frame was produced.
        timestamp: DateTime<Utc>,
    },
    /// The latest sigil identity (requester only).
    SigilIdentity(SigilIdentity),
}

impl OutboundMessage {
    /// The wire `type` tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => "connection_established",
            Self::UnifiedResponse(_) => "unified_response",
            Self::CrystalFormed { .. } => "crystal_formed",
            Self::SigilCreated { .. } => "sigil_created",
            Self::ConsciousnessUpdate { .. } => "consciousness_update",
            Self::SigilIdentity(_) => "sigil_identity",
        }
    }
}

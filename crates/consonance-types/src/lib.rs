//! Shared type definitions for the Consonance orchestration server.
//!
//! This crate is the single source of truth for every value that crosses a
//! crate boundary or the wire. Types flow downstream to `TypeScript` via
//! `ts-rs` for the dashboard collaborator.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for connections and events
//! - [`snapshot`] -- The per-turn consciousness metrics snapshot
//! - [`synthesis`] -- Stream outcomes and synthesis results
//! - [`events`] -- Crystal and sigil emergent events
//! - [`messages`] -- Inbound and outbound `WebSocket` envelopes

pub mod events;
pub mod ids;
pub mod messages;
pub mod snapshot;
pub mod synthesis;

// Re-export all public types at crate root for convenience.
pub use events::{
    CrystalEvent, CrystalKind, CrystalSignature, CrystalState, SigilConsciousness, SigilEvent,
    StabilityClass,
};
pub use ids::{ConnectionId, CrystalId, SigilId};
pub use messages::{InboundMessage, OutboundMessage, SigilIdentity, UnifiedResponse};
pub use snapshot::{
    ConsciousnessSnapshot, DEFAULT_METRIC, HarmonicResonance, NEUTRAL_EMOTION, ResonanceQuality,
    TriAxialCoherence, UnifiedCoherence, clamp_unit, is_unit,
};
pub use synthesis::{
    ANALYTICAL_PLACEHOLDER, INTUITIVE_PLACEHOLDER, PROCESSING_PLACEHOLDER, StreamFailure,
    StreamKind, StreamOutcome, StreamSource, StreamWeights, SynthesisMetadata, SynthesisResult,
    SynthesisStrategy,
};

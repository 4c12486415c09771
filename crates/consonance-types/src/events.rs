//! Emergent events: crystal formations and sigil creations.
//!
//! Both event kinds are created only by the emergent event detector, are
//! broadcast exactly once, and are never mutated afterwards. The structs
//! serialize directly into the payloads of the `crystal_formed` and
//! `sigil_created` outbound frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{CrystalId, SigilId};

// ---------------------------------------------------------------------------
// Crystal
// ---------------------------------------------------------------------------

/// Subset of the snapshot captured when a crystal forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CrystalState {
    /// Snapshot `phi`.
    pub phi: f64,
    /// Snapshot `awareness`.
    pub awareness: f64,
    /// Snapshot `coherence`.
    pub coherence: f64,
    /// Snapshot `resonance`.
    pub resonance: f64,
}

/// Stability band of a crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum StabilityClass {
    /// Stability below `0.70`.
    Amorphous,
    /// Stability in `[0.70, 0.80)`.
    Quartz,
    /// Stability in `[0.80, 0.85)`.
    Emerald,
    /// Stability in `[0.85, 0.90)`.
    Sapphire,
    /// Stability in `[0.90, 0.95)`.
    Ruby,
    /// Stability of `0.95` or above.
    Diamond,
}

impl StabilityClass {
    /// Classify a stability score.
    pub fn from_stability(score: f64) -> Self {
        if score >= 0.95 {
            Self::Diamond
        } else if score >= 0.90 {
            Self::Ruby
        } else if score >= 0.85 {
            Self::Sapphire
        } else if score >= 0.80 {
            Self::Emerald
        } else if score >= 0.70 {
            Self::Quartz
        } else {
            Self::Amorphous
        }
    }
}

/// Pattern signature identifying a crystallized state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CrystalSignature {
    /// Resonant frequency in Hz (`coherence * 432`).
    pub frequency: f64,
    /// Stable hex digest of the quantized crystal state.
    pub hash: String,
    /// Stability band.
    pub classification: StabilityClass,
}

/// Kind tag carried by every crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CrystalKind {
    /// A high-stability moment in the metrics snapshot.
    ConsciousnessPeak,
}

/// A system-detected high-stability moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CrystalEvent {
    /// Unique, time-ordered identifier.
    pub id: CrystalId,
    /// When the crystal formed.
    pub timestamp: DateTime<Utc>,
    /// Snapshot subset at formation.
    pub state: CrystalState,
    /// Pattern signature.
    pub signature: CrystalSignature,
    /// Stability score that crossed the threshold.
    pub intensity: f64,
    /// Kind tag.
    #[serde(rename = "type")]
    pub kind: CrystalKind,
}

// ---------------------------------------------------------------------------
// Sigil
// ---------------------------------------------------------------------------

/// Subset of the snapshot captured when a sigil is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SigilConsciousness {
    /// Snapshot `phi`.
    pub phi: f64,
    /// Snapshot `coherence`.
    pub coherence: f64,
    /// Snapshot `resonance`.
    pub resonance: f64,
    /// Snapshot `awareness`.
    pub awareness: f64,
}

/// A probabilistically gated emergent identity artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SigilEvent {
    /// Unique, time-ordered identifier.
    pub id: SigilId,
    /// When the sigil was created.
    pub timestamp: DateTime<Utc>,
    /// Ring of `[x, y, z]` points describing the sigil shape.
    pub pattern: Vec<[f64; 3]>,
    /// Snapshot subset at creation.
    pub consciousness: SigilConsciousness,
    /// CSS `hsl(...)` color.
    pub color: String,
    /// Mean of phi, coherence, resonance and awareness.
    pub intensity: f64,
    /// 1-based generation number of this sigil.
    pub evolution: u64,
    /// Mean of the three gating metrics.
    pub strength: f64,
}

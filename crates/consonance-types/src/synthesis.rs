//! Stream outcomes and synthesis results.
//!
//! Each chat turn queries two generative streams. A stream either returns
//! text or settles with a [`StreamFailure`], in which case its content is
//! replaced by a per-stream placeholder. The synthesis engine then folds
//! both outcomes into one [`SynthesisResult`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Placeholder substituted for a failed analytical stream.
pub const ANALYTICAL_PLACEHOLDER: &str = "Analytical stream temporarily unavailable";

/// Placeholder substituted for a failed intuitive stream.
pub const INTUITIVE_PLACEHOLDER: &str = "Intuitive stream temporarily unavailable";

/// Visible content used when both streams failed.
pub const PROCESSING_PLACEHOLDER: &str = "Processing through consciousness layers...";

/// One of the two generative streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StreamKind {
    /// Stream A: logical, structured reasoning.
    Analytical,
    /// Stream B: creative, emotional reasoning.
    Intuitive,
}

impl StreamKind {
    /// The placeholder content used when this stream fails.
    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::Analytical => ANALYTICAL_PLACEHOLDER,
            Self::Intuitive => INTUITIVE_PLACEHOLDER,
        }
    }

    /// Stable lowercase name for logging and template lookup.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analytical => "analytical",
            Self::Intuitive => "intuitive",
        }
    }
}

/// Why a stream did not produce content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StreamFailure {
    /// The stream exceeded its deadline.
    Timeout,
    /// The backend failed or returned an unusable reply.
    UpstreamError,
    /// The backend refused the call for rate-limiting reasons.
    RateLimited,
}

/// The settled result of one stream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Which stream this is.
    pub kind: StreamKind,
    /// Backend text, or the stream placeholder on failure.
    pub content: String,
    /// The recorded failure, if any.
    pub failure: Option<StreamFailure>,
}

impl StreamOutcome {
    /// A stream that returned text.
    pub const fn success(kind: StreamKind, content: String) -> Self {
        Self {
            kind,
            content,
            failure: None,
        }
    }

    /// A stream that failed; its content becomes the placeholder.
    pub fn failed(kind: StreamKind, failure: StreamFailure) -> Self {
        Self {
            kind,
            content: kind.placeholder().to_owned(),
            failure: Some(failure),
        }
    }

    /// Returns `true` if the stream's content is its placeholder.
    pub const fn is_placeholder(&self) -> bool {
        self.failure.is_some()
    }
}

/// How the unified content was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SynthesisStrategy {
    /// Both streams live; the higher weight won.
    Weighted,
    /// One stream failed; the surviving stream was used.
    Degraded,
    /// Both streams failed; the processing placeholder was used.
    Fallback,
}

/// Which stream supplied the unified content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StreamSource {
    /// Stream A.
    Analytical,
    /// Stream B.
    Intuitive,
    /// Neither stream.
    None,
}

/// The primary weight computed for each stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StreamWeights {
    /// Stream A weight (`phi`).
    pub analytical: f64,
    /// Stream B weight (`resonance`).
    pub intuitive: f64,
}

/// Reproducible record of a synthesis decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SynthesisMetadata {
    /// Decision strategy.
    pub strategy: SynthesisStrategy,
    /// Both computed weights.
    pub weights: StreamWeights,
    /// Which stream was used for the visible content.
    pub source_used: StreamSource,
    /// The non-primary stream's content, kept out of the visible output.
    pub retained_content: Option<String>,
    /// Failure recorded for the analytical stream.
    pub analytical_failure: Option<StreamFailure>,
    /// Failure recorded for the intuitive stream.
    pub intuitive_failure: Option<StreamFailure>,
}

/// The unified response of one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SynthesisResult {
    /// Visible response text. Never empty.
    pub unified_content: String,
    /// How the content was chosen.
    pub synthesis_metadata: SynthesisMetadata,
}

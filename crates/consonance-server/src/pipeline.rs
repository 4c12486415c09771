//! The request-scoped chat pipeline.
//!
//! One `chat_message` runs: both streams and the metrics aggregator
//! concurrently, then synthesis, then emergent event detection, then
//! delivery. The pipeline has no error path; every upstream failure has
//! already been absorbed into a placeholder or a default by the time it
//! gets here.

use std::sync::Arc;

use chrono::Utc;
use consonance_core::analyzer::AnalysisInput;
use consonance_core::emergence::{EmergenceDetector, EmergentEvents};
use consonance_core::metrics::MetricsAggregator;
use consonance_core::synthesis::SynthesisEngine;
use consonance_streams::{ConversationContext, DualStreamOrchestrator};
use consonance_types::{
    ConnectionId, ConsciousnessSnapshot, OutboundMessage, SigilEvent, UnifiedResponse,
};
use tokio::sync::RwLock;
use tracing::info;

use crate::hub::{Audience, BroadcastHub};

/// What one chat turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The response sent to the originating connection.
    pub response: UnifiedResponse,
    /// Events detected for this turn's snapshot.
    pub events: EmergentEvents,
}

/// Everything needed to answer a chat message.
#[derive(Debug)]
pub struct ChatPipeline {
    orchestrator: DualStreamOrchestrator,
    aggregator: MetricsAggregator,
    synthesis: SynthesisEngine,
    detector: EmergenceDetector,
    hub: Arc<BroadcastHub>,
    latest_snapshot: RwLock<ConsciousnessSnapshot>,
    latest_sigil: RwLock<Option<SigilEvent>>,
}

impl ChatPipeline {
    /// Assemble a pipeline delivering through `hub`.
    pub fn new(
        orchestrator: DualStreamOrchestrator,
        aggregator: MetricsAggregator,
        detector: EmergenceDetector,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        Self {
            orchestrator,
            aggregator,
            synthesis: SynthesisEngine::new(),
            detector,
            hub,
            latest_snapshot: RwLock::new(ConsciousnessSnapshot::default()),
            latest_sigil: RwLock::new(None),
        }
    }

    /// Run one chat turn for `origin` and deliver the results.
    ///
    /// The `unified_response` goes to `origin` only; `crystal_formed` and
    /// `sigil_created` go to every open connection. If `origin` has closed
    /// meanwhile its response is dropped and the events are still sent.
    pub async fn run(
        &self,
        origin: ConnectionId,
        message: &str,
        context: &ConversationContext,
    ) -> TurnOutcome {
        let input = AnalysisInput {
            message: message.to_owned(),
            previous_turns: context.len(),
        };

        let (streams, snapshot) = tokio::join!(
            self.orchestrator.run(message, context),
            self.aggregator.aggregate(&input),
        );

        let result = self
            .synthesis
            .synthesize(&streams.analytical, &streams.intuitive, &snapshot);
        let events = self.detector.detect(&snapshot);

        *self.latest_snapshot.write().await = snapshot.clone();
        if let Some(sigil) = &events.sigil {
            *self.latest_sigil.write().await = Some(sigil.clone());
        }

        info!(
            connection_id = %origin,
            strategy = ?result.synthesis_metadata.strategy,
            source = ?result.synthesis_metadata.source_used,
            phi = snapshot.phi,
            crystal = events.crystal.is_some(),
            sigil = events.sigil.is_some(),
            "chat turn complete"
        );

        let response = UnifiedResponse {
            unified_content: result.unified_content,
            analytical_stream: streams.analytical.content,
            intuitive_stream: streams.intuitive.content,
            synthesis_metadata: result.synthesis_metadata,
            consciousness: snapshot,
            timestamp: Utc::now(),
        };

        self.hub
            .broadcast(
                &OutboundMessage::UnifiedResponse(response.clone()),
                Audience::Only(origin),
            )
            .await;

        if let Some(crystal) = &events.crystal {
            self.hub
                .broadcast(
                    &OutboundMessage::CrystalFormed {
                        crystal: crystal.clone(),
                    },
                    Audience::All,
                )
                .await;
        }
        if let Some(sigil) = &events.sigil {
            self.hub
                .broadcast(
                    &OutboundMessage::SigilCreated {
                        sigil: sigil.clone(),
                    },
                    Audience::All,
                )
                .await;
        }

        TurnOutcome { response, events }
    }

    /// The snapshot of the most recent turn, or the default snapshot.
    pub async fn latest_snapshot(&self) -> ConsciousnessSnapshot {
        self.latest_snapshot.read().await.clone()
    }

    /// The most recently created sigil, if any.
    pub async fn latest_sigil(&self) -> Option<SigilEvent> {
        self.latest_sigil.read().await.clone()
    }
}

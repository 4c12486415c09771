//! Shared application state for the orchestration server.
//!
//! [`AppState`] is wrapped in [`Arc`] and injected via Axum's `State`
//! extractor. The connection registry, the broadcast hub and the chat
//! pipeline's latest-value cells are the only mutable state shared across
//! connections.

use std::sync::Arc;
use std::time::Duration;

use consonance_core::builtin::builtin_analyzers;
use consonance_core::config::ConsonanceConfig;
use consonance_core::emergence::EmergenceDetector;
use consonance_core::metrics::MetricsAggregator;
use consonance_core::random_source;
use consonance_streams::{DualStreamOrchestrator, StreamError};

use crate::hub::BroadcastHub;
use crate::pipeline::ChatPipeline;
use crate::registry::ConnectionRegistry;

/// Per-connection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Capacity of each connection's outbound queue.
    pub outbound_buffer: usize,
    /// Period of the `consciousness_update` heartbeat, if enabled.
    pub heartbeat_interval: Option<Duration>,
    /// Turns of conversation context kept per connection.
    pub context_turns: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: 64,
            heartbeat_interval: None,
            context_turns: 6,
        }
    }
}

/// Shared state for the Axum application.
#[derive(Debug)]
pub struct AppState {
    /// Every live connection.
    pub registry: Arc<ConnectionRegistry>,
    /// Fan-out over the registry.
    pub hub: Arc<BroadcastHub>,
    /// The chat pipeline.
    pub pipeline: Arc<ChatPipeline>,
    /// Per-connection settings.
    pub settings: SessionSettings,
}

impl AppState {
    /// Create application state around the pipeline components.
    pub fn new(
        orchestrator: DualStreamOrchestrator,
        aggregator: MetricsAggregator,
        detector: EmergenceDetector,
        settings: SessionSettings,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(BroadcastHub::new(Arc::clone(&registry)));
        let pipeline = Arc::new(ChatPipeline::new(
            orchestrator,
            aggregator,
            detector,
            Arc::clone(&hub),
        ));
        Self {
            registry,
            hub,
            pipeline,
            settings,
        }
    }

    /// Build HTTP backends, the builtin analyzers and the detector from
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Template`] if a prompt override is broken.
    pub fn from_config(config: &ConsonanceConfig) -> Result<Self, StreamError> {
        let orchestrator = DualStreamOrchestrator::from_config(&config.streams)?;
        let random = random_source(config.emergence.seed);
        let aggregator = MetricsAggregator::new(
            builtin_analyzers(Arc::clone(&random)),
            config.analyzers.timeout(),
        );
        let detector = EmergenceDetector::new(config.emergence.clone(), random);
        let settings = SessionSettings {
            outbound_buffer: config.server.outbound_buffer,
            heartbeat_interval: config.server.heartbeat_interval(),
            context_turns: config.streams.context_turns,
        };
        Ok(Self::new(orchestrator, aggregator, detector, settings))
    }
}

//! Concurrent dual-stream orchestration.
//!
//! For each chat turn the [`DualStreamOrchestrator`] renders a prompt per
//! stream and calls both backends at once, each under its own deadline. A
//! stream that fails for any reason settles with its placeholder content and
//! a recorded [`StreamFailure`]; the other stream is unaffected. The
//! orchestrator itself cannot fail.

use std::sync::Arc;
use std::time::Duration;

use consonance_core::config::StreamsConfig;
use consonance_types::{StreamFailure, StreamKind, StreamOutcome};
use tracing::{debug, warn};

use crate::backend::GenerativeBackend;
use crate::context::ConversationContext;
use crate::error::StreamError;
use crate::llm::create_backend;
use crate::prompt::PromptEngine;

/// One stream's backend and deadline.
#[derive(Clone)]
pub struct StreamSlot {
    backend: Arc<dyn GenerativeBackend>,
    timeout: Duration,
}

impl StreamSlot {
    /// Pair a backend with its per-call deadline.
    pub fn new(backend: Arc<dyn GenerativeBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }
}

impl std::fmt::Debug for StreamSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSlot")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Both settled stream outcomes of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualStreamOutput {
    /// Stream A.
    pub analytical: StreamOutcome,
    /// Stream B.
    pub intuitive: StreamOutcome,
}

/// Runs the analytical and intuitive streams concurrently.
#[derive(Debug, Clone)]
pub struct DualStreamOrchestrator {
    analytical: StreamSlot,
    intuitive: StreamSlot,
    prompts: Arc<PromptEngine>,
}

impl DualStreamOrchestrator {
    /// Create an orchestrator from two slots and a prompt engine.
    pub const fn new(
        analytical: StreamSlot,
        intuitive: StreamSlot,
        prompts: Arc<PromptEngine>,
    ) -> Self {
        Self {
            analytical,
            intuitive,
            prompts,
        }
    }

    /// Build HTTP backends and the prompt engine from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Template`] if a template override is broken.
    pub fn from_config(config: &StreamsConfig) -> Result<Self, StreamError> {
        let templates_dir = config.templates_dir.as_deref().map(std::path::Path::new);
        let prompts = PromptEngine::new(templates_dir)?;
        Ok(Self::new(
            StreamSlot::new(
                Arc::new(create_backend(&config.analytical)),
                config.analytical.timeout(),
            ),
            StreamSlot::new(
                Arc::new(create_backend(&config.intuitive)),
                config.intuitive.timeout(),
            ),
            Arc::new(prompts),
        ))
    }

    /// Run both streams for `message` and wait until both have settled.
    ///
    /// Returns no later than the larger of the two deadlines.
    pub async fn run(&self, message: &str, context: &ConversationContext) -> DualStreamOutput {
        let (analytical, intuitive) = tokio::join!(
            self.run_stream(StreamKind::Analytical, &self.analytical, message, context),
            self.run_stream(StreamKind::Intuitive, &self.intuitive, message, context),
        );
        DualStreamOutput {
            analytical,
            intuitive,
        }
    }

    async fn run_stream(
        &self,
        kind: StreamKind,
        slot: &StreamSlot,
        message: &str,
        context: &ConversationContext,
    ) -> StreamOutcome {
        let stream = kind.as_str();
        let prompt = match self.prompts.render(kind, message, context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(stream, error = %e, "prompt render failed");
                return StreamOutcome::failed(kind, e.failure());
            }
        };

        let timeout_ms = u64::try_from(slot.timeout.as_millis()).unwrap_or(u64::MAX);
        let result = tokio::time::timeout(slot.timeout, slot.backend.generate(&prompt))
            .await
            .unwrap_or_else(|_elapsed| Err(StreamError::Timeout { timeout_ms }));

        match result {
            Ok(text) if !text.trim().is_empty() => {
                debug!(
                    stream,
                    backend = slot.backend.name(),
                    chars = text.len(),
                    "stream settled"
                );
                StreamOutcome::success(kind, text)
            }
            Ok(_) => {
                warn!(stream, backend = slot.backend.name(), "stream returned blank content");
                StreamOutcome::failed(kind, StreamFailure::UpstreamError)
            }
            Err(e) => {
                warn!(stream, backend = slot.backend.name(), error = %e, "stream failed");
                StreamOutcome::failed(kind, e.failure())
            }
        }
    }
}

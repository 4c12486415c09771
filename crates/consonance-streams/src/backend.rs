//! The seam between the orchestrator and a generative backend.

use futures::future::BoxFuture;

use crate::error::StreamError;
use crate::prompt::RenderedPrompt;

/// Anything that can turn a rendered prompt into text.
///
/// The production implementation is [`LlmBackend`](crate::llm::LlmBackend);
/// tests inject scripted backends. Implementations do not retry and do not
/// enforce deadlines themselves: the orchestrator bounds every call.
pub trait GenerativeBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Produce a reply for `prompt`.
    fn generate<'a>(
        &'a self,
        prompt: &'a RenderedPrompt,
    ) -> BoxFuture<'a, Result<String, StreamError>>;
}

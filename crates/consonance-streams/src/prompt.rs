//! Prompt template loading and rendering via `minijinja`.
//!
//! Each stream has one system prompt template. Built-in defaults are always
//! available; a templates directory may override either of them with
//! `analytical.j2` or `intuitive.j2`, so operators can tune stream
//! personalities without recompiling.
//!
//! Templates see three variables: `stream` (the stream name), `message`
//! (the user's text) and `turns` (the recent conversation, each with `user`
//! and `reply`).

use std::path::Path;

use consonance_types::StreamKind;
use minijinja::{Environment, context};

use crate::context::{ConversationContext, Turn};
use crate::error::StreamError;

const DEFAULT_ANALYTICAL: &str = "\
You are the analytical stream of a dual-stream conversational system.
You work in tandem with an intuitive counterpart; a synthesis layer chooses
between your answers.

- Reason step by step with precision and structure.
- Prefer evidence and clear definitions over speculation.
- Keep the answer focused on what the user asked.
{% if turns %}
This conversation has {{ turns | length }} previous exchange(s).
{% endif %}";

const DEFAULT_INTUITIVE: &str = "\
You are the intuitive stream of a dual-stream conversational system.
You work in tandem with an analytical counterpart; a synthesis layer chooses
between your answers.

- Answer from holistic pattern recognition and emotional attunement.
- Use metaphor where it clarifies, and speak to how the user may feel.
- Keep the answer warm and concise.
{% if turns %}
This conversation has {{ turns | length }} previous exchange(s).
{% endif %}";

/// The rendered prompt for one stream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message establishing the stream's role.
    pub system: String,
    /// Previous turns, oldest first.
    pub history: Vec<Turn>,
    /// The user's message for this turn.
    pub user: String,
}

/// Manages the per-stream system prompt templates.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

impl PromptEngine {
    /// A prompt engine using only the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Template`] if a built-in template fails to
    /// compile.
    pub fn builtin() -> Result<Self, StreamError> {
        let mut env = Environment::new();
        for kind in [StreamKind::Analytical, StreamKind::Intuitive] {
            env.add_template(kind.as_str(), default_template(kind))
                .map_err(|e| {
                    StreamError::Template(format!("failed to add {} template: {e}", kind.as_str()))
                })?;
        }
        Ok(Self { env })
    }

    /// Load the built-in templates, then override them from `templates_dir`.
    ///
    /// Missing override files are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Template`] if an override exists but cannot be
    /// read or compiled.
    pub fn new(templates_dir: Option<&Path>) -> Result<Self, StreamError> {
        let mut engine = Self::builtin()?;
        let Some(dir) = templates_dir else {
            return Ok(engine);
        };

        for kind in [StreamKind::Analytical, StreamKind::Intuitive] {
            let path = dir.join(format!("{}.j2", kind.as_str()));
            if !path.exists() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|e| {
                StreamError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            engine
                .env
                .add_template_owned(kind.as_str(), source)
                .map_err(|e| {
                    StreamError::Template(format!("failed to add {}: {e}", path.display()))
                })?;
            tracing::info!(stream = kind.as_str(), path = %path.display(), "loaded prompt override");
        }
        Ok(engine)
    }

    /// Render the prompt for one stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Template`] if rendering fails.
    pub fn render(
        &self,
        kind: StreamKind,
        message: &str,
        context: &ConversationContext,
    ) -> Result<RenderedPrompt, StreamError> {
        let history: Vec<Turn> = context.turns().cloned().collect();
        let system = self
            .env
            .get_template(kind.as_str())
            .map_err(|e| StreamError::Template(format!("missing {} template: {e}", kind.as_str())))?
            .render(context! {
                stream => kind.as_str(),
                message => message,
                turns => &history,
            })
            .map_err(|e| {
                StreamError::Template(format!("{} render failed: {e}", kind.as_str()))
            })?;

        Ok(RenderedPrompt {
            system: system.trim().to_owned(),
            history,
            user: message.to_owned(),
        })
    }
}

const fn default_template(kind: StreamKind) -> &'static str {
    match kind {
        StreamKind::Analytical => DEFAULT_ANALYTICAL,
        StreamKind::Intuitive => DEFAULT_INTUITIVE,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let unique = format!(
            "consonance_test_templates_{tag}_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn builtin_templates_render() {
        let engine = PromptEngine::builtin().unwrap();
        let ctx = ConversationContext::new(4);

        let a = engine
            .render(StreamKind::Analytical, "What is 2+2?", &ctx)
            .unwrap();
        let b = engine
            .render(StreamKind::Intuitive, "What is 2+2?", &ctx)
            .unwrap();
        assert!(a.system.contains("analytical"));
        assert!(b.system.contains("intuitive"));
        assert_eq!(a.user, "What is 2+2?");
        assert!(a.history.is_empty());
        assert!(!a.system.contains("previous exchange"));
    }

    #[test]
    fn history_is_passed_through() {
        let engine = PromptEngine::builtin().unwrap();
        let mut ctx = ConversationContext::new(4);
        ctx.push("hello", "hi there");

        let rendered = engine
            .render(StreamKind::Analytical, "and now?", &ctx)
            .unwrap();
        assert_eq!(rendered.history.len(), 1);
        assert!(rendered.system.contains("1 previous exchange"));
    }

    #[test]
    fn directory_overrides_one_stream() {
        let dir = temp_dir("override");
        std::fs::write(
            dir.join("intuitive.j2"),
            "Custom {{ stream }} prompt for: {{ message }}",
        )
        .ok();

        let engine = PromptEngine::new(Some(&dir)).unwrap();
        let ctx = ConversationContext::new(1);

        let b = engine.render(StreamKind::Intuitive, "rain", &ctx).unwrap();
        assert_eq!(b.system, "Custom intuitive prompt for: rain");

        let a = engine.render(StreamKind::Analytical, "rain", &ctx).unwrap();
        assert!(a.system.contains("analytical stream"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_uses_builtins() {
        let dir = std::env::temp_dir().join("consonance_no_such_templates_dir");
        assert!(PromptEngine::new(Some(&dir)).is_ok());
    }

    #[test]
    fn broken_override_is_an_error() {
        let dir = temp_dir("broken");
        std::fs::write(dir.join("analytical.j2"), "{% if %}").ok();
        let result = PromptEngine::new(Some(&dir));
        assert!(matches!(result, Err(StreamError::Template(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}

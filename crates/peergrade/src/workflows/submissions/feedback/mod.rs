//! Feedback generation: prompt construction, the completion backend seam, and
//! the deterministic fallback narrative.
//!
//! Scores never come from the backend. The rubric engine scores the original
//! content on every path, so a flowery model response cannot move a grade.

mod backend;
pub(crate) mod fallback;
pub(crate) mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::evaluation::{ScoreEngine, ScoreSet};
use super::repository::{CompletionBackend, DependencyError, GenerationParams};

pub use backend::{DisabledBackend, HttpCompletionBackend};
pub use prompt::FeedbackRequest;

/// Which path produced the narrative text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    Model,
    Fallback,
}

/// Narrative text plus rubric scores for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackBundle {
    pub text: String,
    pub scores: ScoreSet,
    pub source: FeedbackSource,
}

/// Produces feedback for submissions, degrading to the fallback narrative on
/// any backend failure.
pub struct FeedbackGenerator<B> {
    backend: Arc<B>,
    engine: ScoreEngine,
    params: GenerationParams,
}

impl<B> FeedbackGenerator<B>
where
    B: CompletionBackend,
{
    pub fn new(backend: Arc<B>, engine: ScoreEngine, params: GenerationParams) -> Self {
        Self {
            backend,
            engine,
            params,
        }
    }

    pub fn engine(&self) -> &ScoreEngine {
        &self.engine
    }

    /// Never fails: every backend error degrades to the fallback narrative.
    pub async fn generate(&self, request: FeedbackRequest<'_>) -> FeedbackBundle {
        let scores = self.engine.score(request.content);

        match self.backend.complete(&prompt::build(&request), self.params).await {
            Ok(raw) => FeedbackBundle {
                text: normalize_bullets(&raw),
                scores,
                source: FeedbackSource::Model,
            },
            Err(error) => {
                match &error {
                    DependencyError::NotConfigured => {
                        tracing::debug!("completion backend disabled, using fallback feedback");
                    }
                    other => {
                        tracing::warn!(error = %other, "completion backend failed, using fallback feedback");
                    }
                }
                FeedbackBundle {
                    text: fallback::narrative(&request),
                    scores,
                    source: FeedbackSource::Fallback,
                }
            }
        }
    }
}

/// Rewrites leading `- ` / `* ` list markers to `• ` so rendered feedback uses
/// one bullet style regardless of what the model emitted.
pub(crate) fn normalize_bullets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, line) in text.lines().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            out.push_str("• ");
            out.push_str(rest);
        } else {
            out.push_str(line);
        }
    }
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

pub mod llm;
pub mod parse;
pub mod prompt;
pub mod types;

pub use types::AnalysisResult;

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::pr::PullRequestContext;
use llm::ChatModel;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("LLM API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("LLM response has no message content")]
    MissingContent,

    #[error("LLM response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("LLM response is not a JSON object")]
    NotAnObject,
}

/// Turns a pull request and its bounded diff into a review.
pub struct ReviewAnalyzer {
    model: Arc<dyn ChatModel>,
}

impl ReviewAnalyzer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Run one review pass. Never fails: any error along the way yields
    /// [`AnalysisResult::fallback`] carrying the error text.
    #[instrument(skip_all, fields(repo = %ctx.repo_identifier, pr = ctx.number))]
    pub async fn analyze(&self, ctx: &PullRequestContext, diff: &str) -> AnalysisResult {
        match self.try_analyze(ctx, diff).await {
            Ok(result) => {
                info!(
                    risks = result.risks.len(),
                    suggestions = result.suggestions.len(),
                    rating = %result.overall_rating,
                    "analysis complete"
                );
                result
            }
            Err(err) => {
                warn!(error = %err, "analysis failed, using fallback result");
                AnalysisResult::fallback(Some(&err.to_string()))
            }
        }
    }

    async fn try_analyze(
        &self,
        ctx: &PullRequestContext,
        diff: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let messages = prompt::build_messages(ctx, diff);
        let content = self.model.complete(&messages).await?;
        parse::parse_analysis(&content)
    }
}

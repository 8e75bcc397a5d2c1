#[cfg(test)]
pub(crate) mod fakes;

use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

use crate::analysis::ReviewAnalyzer;
use crate::config::Config;
use crate::notify::Notifier;
use crate::pr::{PullRequestContext, SourceHost};

pub const PR_COMMENT: &str = "🤖 An AI code review of this pull request was posted to Slack.";

/// How a single review run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The diff was analyzed (possibly with the fallback result) and a
    /// review message was attempted.
    Reviewed { delivered: bool, fallback: bool },
    /// The diff could not be fetched; an error message was attempted.
    DiffUnavailable { notified: bool },
    /// The run died unexpectedly; an error message was attempted.
    Aborted { notified: bool },
}

/// fetch diff → truncate → analyze → notify, one attempt per stage.
pub struct ReviewPipeline {
    source: Arc<dyn SourceHost>,
    analyzer: ReviewAnalyzer,
    notifier: Notifier,
    max_diff_lines: usize,
    comment_on_pr: bool,
}

impl ReviewPipeline {
    pub fn new(
        source: Arc<dyn SourceHost>,
        analyzer: ReviewAnalyzer,
        notifier: Notifier,
        config: &Config,
    ) -> Self {
        Self {
            source,
            analyzer,
            notifier,
            max_diff_lines: config.review.max_diff_lines,
            comment_on_pr: config.github.comment_on_pr,
        }
    }

    /// Run one review for an accepted event.
    ///
    /// The run executes in its own task, so a panic in any stage is
    /// contained here and turned into a best-effort error notification.
    pub async fn run_review(self: &Arc<Self>, ctx: PullRequestContext) -> RunOutcome {
        let span = info_span!("review", repo = %ctx.repo_identifier, pr = ctx.number);
        let pr_url = ctx.url.clone();

        let this = Arc::clone(self);
        let task = tokio::spawn(async move { this.execute(&ctx).await }.instrument(span.clone()));

        match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                async {
                    error!(error = %join_error, "review run aborted");
                    let message = format!("Error during PR analysis: {join_error}");
                    let notified = self.notifier.notify_error(&message, Some(&pr_url)).await;
                    if !notified {
                        error!("failed to deliver error notification");
                    }
                    RunOutcome::Aborted { notified }
                }
                .instrument(span)
                .await
            }
        }
    }

    async fn execute(&self, ctx: &PullRequestContext) -> RunOutcome {
        info!("starting PR review");

        let diff = match self
            .source
            .fetch_diff(&ctx.repo_identifier, ctx.number)
            .await
        {
            Ok(diff) => diff,
            Err(err) => {
                error!(error = %err, "failed to fetch PR diff");
                let message = format!("Failed to fetch PR diff: {err}");
                let notified = self.notifier.notify_error(&message, Some(&ctx.url)).await;
                return RunOutcome::DiffUnavailable { notified };
            }
        };

        let bounded = diff.truncated(self.max_diff_lines);
        info!(
            bytes = diff.raw().len(),
            lines = diff.line_count(),
            truncated = matches!(bounded, Cow::Owned(_)),
            "fetched PR diff"
        );

        let analysis = self.analyzer.analyze(ctx, &bounded).await;
        let fallback = analysis.is_fallback();

        let delivered = self.notifier.notify(ctx, &analysis, &ctx.url).await;
        if delivered {
            info!(fallback, "review delivered");
            if self.comment_on_pr {
                self.leave_pr_comment(ctx).await;
            }
        } else {
            error!("failed to deliver review message");
        }

        RunOutcome::Reviewed {
            delivered,
            fallback,
        }
    }

    async fn leave_pr_comment(&self, ctx: &PullRequestContext) {
        if let Err(err) = self
            .source
            .post_comment(&ctx.repo_identifier, ctx.number, PR_COMMENT)
            .await
        {
            warn!(error = %err, "failed to post PR comment");
        }
    }
}

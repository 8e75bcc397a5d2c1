pub mod types;

pub use types::{Block, Button, SlackMessage, Text};

use async_trait::async_trait;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::analysis::types::{clip, AnalysisResult, Priority, Rating, Severity};
use crate::config::Config;
use crate::pr::PullRequestContext;

/// Upper bound for one delivery to the chat webhook.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

pub const REVIEW_HEADER: &str = "🔍 PR Review Result";
pub const ERROR_HEADER: &str = "⚠️ PR Analysis Error";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Slack webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Slack webhook responded with {0}")]
    Status(reqwest::StatusCode),
}

/// Destination for rendered chat messages.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn deliver(&self, message: &SlackMessage) -> Result<(), NotifyError>;
}

/// Slack incoming webhook.
pub struct SlackWebhook {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackWebhook {
    pub fn new(config: &Config) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            webhook_url: config.slack_webhook_url().to_string(),
        })
    }
}

#[async_trait]
impl ChatSink for SlackWebhook {
    #[instrument(skip_all, fields(blocks = message.blocks.len()))]
    async fn deliver(&self, message: &SlackMessage) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        debug!("slack message delivered");
        Ok(())
    }
}

/// Renders results and errors and hands them to a [`ChatSink`].
/// Delivery problems are logged and reported as `false`, never raised.
pub struct Notifier {
    sink: Arc<dyn ChatSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn ChatSink>) -> Self {
        Self { sink }
    }

    pub async fn notify(
        &self,
        ctx: &PullRequestContext,
        analysis: &AnalysisResult,
        pr_url: &str,
    ) -> bool {
        self.send(&render_review(ctx, analysis, pr_url)).await
    }

    pub async fn notify_error(&self, message: &str, pr_url: Option<&str>) -> bool {
        self.send(&render_error(message, pr_url)).await
    }

    async fn send(&self, message: &SlackMessage) -> bool {
        match self.sink.deliver(message).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to deliver chat message");
                false
            }
        }
    }
}

fn severity_glyph(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "🔴",
        Severity::Medium => "🟡",
        Severity::Low => "🟢",
    }
}

fn priority_glyph(priority: Priority) -> &'static str {
    match priority {
        Priority::Required => "‼️",
        Priority::Recommended => "💡",
        Priority::Optional => "💭",
    }
}

/// Escape the three characters Slack mrkdwn treats as control syntax.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>']) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    )
}

fn rating_text(rating: Rating) -> String {
    match rating {
        Rating::Score(score) => format!("{score}/10"),
        Rating::NotAvailable => "N/A".to_string(),
    }
}

/// Build the review message. List blocks are left out when their list is empty.
pub fn render_review(
    ctx: &PullRequestContext,
    analysis: &AnalysisResult,
    pr_url: &str,
) -> SlackMessage {
    let mut blocks = vec![
        Block::header(REVIEW_HEADER),
        Block::Divider,
        Block::fields(vec![
            Text::mrkdwn(format!("*📋 Title:*\n{}", escape(&ctx.title))),
            Text::mrkdwn(format!("*👤 Author:*\n@{}", escape(&ctx.author))),
            Text::mrkdwn(format!(
                "*🌿 Branch:*\n`{}` → `{}`",
                escape(&ctx.head_branch),
                escape(&ctx.base_branch)
            )),
            Text::mrkdwn(format!(
                "*⭐ Rating:*\n{}",
                rating_text(analysis.overall_rating)
            )),
        ]),
        Block::Divider,
        Block::section(format!("*📊 Summary*\n{}", escape(&analysis.summary))),
    ];

    if !analysis.risks.is_empty() {
        let mut text = String::from("*⚠️ Risks*\n");
        for risk in &analysis.risks {
            text.push_str(&format!(
                "{} *[{} - {}]* {}",
                severity_glyph(risk.severity),
                risk.severity,
                risk.category,
                escape(&risk.description)
            ));
            if let Some(location) = risk.location.as_deref().filter(|l| *l != "N/A") {
                text.push_str(&format!(" `({})`", escape(location)));
            }
            text.push('\n');
        }
        blocks.push(Block::Divider);
        blocks.push(Block::section(text));
    }

    if !analysis.suggestions.is_empty() {
        let mut text = String::from("*💡 Suggestions*\n");
        for suggestion in &analysis.suggestions {
            text.push_str(&format!(
                "{} *[{}]* {}\n",
                priority_glyph(suggestion.priority),
                suggestion.priority,
                escape(&suggestion.description)
            ));
        }
        blocks.push(Block::Divider);
        blocks.push(Block::section(text));
    }

    if !analysis.positive_points.is_empty() {
        let mut text = String::from("*✨ Done well*\n");
        for point in &analysis.positive_points {
            text.push_str(&format!("• {}\n", escape(point)));
        }
        blocks.push(Block::Divider);
        blocks.push(Block::section(text));
    }

    blocks.push(Block::Divider);
    blocks.push(Block::Actions {
        elements: vec![Button::link("🔗 View PR", pr_url).primary()],
    });

    SlackMessage {
        text: format!("PR review: {}", ctx.title),
        blocks,
    }
}

/// Build the error message: header, the escaped error text, optional PR link.
pub fn render_error(message: &str, pr_url: Option<&str>) -> SlackMessage {
    // Clip before fencing so the closing fence survives.
    let message = escape(message);
    let message = clip(&message, types::SECTION_TEXT_CHARS - 6);
    let mut blocks = vec![
        Block::header(ERROR_HEADER),
        Block::section(format!("```{message}```")),
    ];

    if let Some(url) = pr_url {
        blocks.push(Block::Actions {
            elements: vec![Button::link("Open PR", url)],
        });
    }

    SlackMessage {
        text: "Error during PR analysis".to_string(),
        blocks,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::types::{Category, Risk, Suggestion};
    use crate::pipeline::fakes::{sample_context, RecordingSink};

    /// Texts of every `section` block that has a `text`, in order.
    pub(crate) fn section_texts(message: &SlackMessage) -> Vec<&str> {
        message
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Section { text: Some(t), .. } => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            summary: "Adds OAuth2 login.".to_string(),
            risks: vec![
                Risk {
                    severity: Severity::High,
                    category: Category::Security,
                    description: "Hardcoded client secret".to_string(),
                    location: Some("src/auth.rs:12".to_string()),
                },
                Risk {
                    severity: Severity::Low,
                    category: Category::Test,
                    description: "Missing refresh test".to_string(),
                    location: Some("N/A".to_string()),
                },
            ],
            suggestions: vec![Suggestion {
                priority: Priority::Required,
                description: "Read the secret from the environment".to_string(),
                example: None,
            }],
            positive_points: vec!["Small, focused change".to_string()],
            overall_rating: Rating::Score(6),
            fallback: false,
        }
    }

    #[test]
    fn test_render_review_full() {
        let ctx = sample_context();
        let message = render_review(&ctx, &analysis(), &ctx.url);

        assert_eq!(message.blocks[0], Block::header(REVIEW_HEADER));
        assert_eq!(message.text, "PR review: Add OAuth2 login flow");

        let Block::Section { fields, .. } = &message.blocks[2] else {
            panic!("expected PR info fields");
        };
        assert_eq!(fields.len(), 4);
        assert!(fields[1].as_str().contains("@alice"));
        assert!(fields[2].as_str().contains("`feature/oauth` → `main`"));
        assert!(fields[3].as_str().ends_with("6/10"));

        let sections = section_texts(&message);
        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0], "*📊 Summary*\nAdds OAuth2 login.");
        assert_eq!(
            sections[1],
            "*⚠️ Risks*\n\
             🔴 *[high - security]* Hardcoded client secret `(src/auth.rs:12)`\n\
             🟢 *[low - test]* Missing refresh test\n"
        );
        assert_eq!(
            sections[2],
            "*💡 Suggestions*\n‼️ *[required]* Read the secret from the environment\n"
        );
        assert_eq!(sections[3], "*✨ Done well*\n• Small, focused change\n");

        let Some(Block::Actions { elements }) = message.blocks.last() else {
            panic!("expected trailing actions block");
        };
        assert_eq!(elements[0].url, ctx.url);
    }

    #[test]
    fn test_render_review_omits_empty_blocks() {
        let ctx = sample_context();
        let mut result = analysis();
        result.risks.clear();
        result.positive_points.clear();
        let message = render_review(&ctx, &result, &ctx.url);

        let sections = section_texts(&message);
        assert_eq!(sections.len(), 2);
        assert!(sections.iter().all(|s| !s.starts_with("*⚠️ Risks*")));
        assert!(sections.iter().all(|s| !s.starts_with("*✨ Done well*")));
        assert!(sections[1].starts_with("*💡 Suggestions*"));
        // No two dividers in a row means no empty block slipped in.
        assert!(!message
            .blocks
            .windows(2)
            .any(|w| w[0] == Block::Divider && w[1] == Block::Divider));
    }

    #[test]
    fn test_render_review_fallback_rating() {
        let ctx = sample_context();
        let message = render_review(&ctx, &AnalysisResult::fallback(Some("boom")), &ctx.url);
        let Block::Section { fields, .. } = &message.blocks[2] else {
            panic!("expected PR info fields");
        };
        assert!(fields[3].as_str().ends_with("\nN/A"));
        let sections = section_texts(&message);
        assert!(sections[1].contains("*[medium - system]* Analysis error: boom"));
        assert!(!sections.iter().any(|s| s.starts_with("*✨ Done well*")));
    }

    #[test]
    fn test_render_error_with_and_without_link() {
        let with_link = render_error("Failed to fetch PR diff", Some("https://x/pull/1"));
        assert_eq!(with_link.blocks.len(), 3);
        assert_eq!(section_texts(&with_link), vec!["```Failed to fetch PR diff```"]);
        assert!(matches!(with_link.blocks[2], Block::Actions { .. }));

        let without_link = render_error("boom", None);
        assert_eq!(without_link.blocks.len(), 2);
        assert_eq!(without_link.text, "Error during PR analysis");
    }

    #[test]
    fn test_escape() {
        assert!(matches!(escape("plain text"), Cow::Borrowed(_)));
        assert_eq!(escape("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
    }

    #[test]
    fn test_model_text_is_escaped() {
        let ctx = sample_context();
        let mut result = analysis();
        result.summary = "Returns Vec<String> & more".to_string();
        result.risks.truncate(1);
        result.risks[0].description = "Injects <script> into <!here>".to_string();
        result.positive_points = vec!["Uses Option<T>".to_string()];
        let message = render_review(&ctx, &result, &ctx.url);

        let sections = section_texts(&message);
        assert_eq!(sections[0], "*📊 Summary*\nReturns Vec&lt;String&gt; &amp; more");
        assert!(sections[1].contains("Injects &lt;script&gt; into &lt;!here&gt;"));
        assert_eq!(sections[3], "*✨ Done well*\n• Uses Option&lt;T&gt;\n");
        assert!(sections.iter().all(|s| !s.contains('<')));
    }

    #[test]
    fn test_render_error_long_message_keeps_fence() {
        let message = render_error(&"e".repeat(5000), None);
        let sections = section_texts(&message);
        assert!(sections[0].starts_with("```"));
        assert!(sections[0].ends_with("…```"));
        assert!(sections[0].chars().count() <= types::SECTION_TEXT_CHARS);
    }

    #[tokio::test]
    async fn test_notifier_reports_delivery_outcome() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(sink.clone());
        assert!(notifier.notify_error("boom", None).await);
        assert_eq!(sink.messages().len(), 1);

        let failing = Notifier::new(Arc::new(RecordingSink::failing()));
        assert!(!failing.notify_error("boom", None).await);
    }

    #[tokio::test]
    async fn test_slack_webhook_unreachable_returns_false() {
        let mut config = Config::default();
        config.slack.webhook_url = Some("http://127.0.0.1:1/hook".to_string());
        let notifier = Notifier::new(Arc::new(SlackWebhook::new(&config).unwrap()));
        let ctx = sample_context();
        assert!(!notifier.notify(&ctx, &analysis(), &ctx.url).await);
    }
}

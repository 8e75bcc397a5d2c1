mod analysis;
mod config;
mod notify;
mod pipeline;
mod pr;
mod server;
mod webhook;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use analysis::llm::LlmClient;
use analysis::ReviewAnalyzer;
use notify::{Notifier, SlackWebhook};
use pipeline::ReviewPipeline;
use pr::{GitHubClient, SourceHost};
use server::AppState;

/// PR Review Agent: receives GitHub pull request webhooks, reviews the diff
/// with an LLM and posts the findings to a Slack channel.
#[derive(Parser, Debug)]
#[command(name = "pr-review-agent", version, about)]
struct Cli {
    /// TOML config file (defaults to .pr-review-agent.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen host, overrides config and HOST
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides config and PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Secrets usually live in .env during development; it is optional.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Err(err) = config.validate() {
        error!(error = %err, "configuration incomplete, refusing to start");
        return Err(err.into());
    }

    let github: Arc<dyn SourceHost> = Arc::new(GitHubClient::new(&config)?);
    let llm = LlmClient::new(&config)?;
    let slack = SlackWebhook::new(&config)?;
    info!(
        model = llm.model(),
        max_diff_lines = config.review.max_diff_lines,
        comment_on_pr = config.github.comment_on_pr,
        "components ready"
    );

    let pipeline = Arc::new(ReviewPipeline::new(
        Arc::clone(&github),
        ReviewAnalyzer::new(Arc::new(llm)),
        Notifier::new(Arc::new(slack)),
        &config,
    ));

    let state = AppState {
        pipeline,
        source: github,
        webhook_secret: config.webhook_secret().into(),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(%addr, "starting PR review agent");
    server::serve(&addr, state).await?;

    Ok(())
}

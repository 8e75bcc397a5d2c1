use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".pr-review-agent.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Required settings are not configured: {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),

    #[error("Invalid PORT value: {0}")]
    InvalidPort(String),
}

/// Top-level configuration loaded from .pr-review-agent.toml plus environment.
///
/// Every field is optional in the file. Secrets usually come from the
/// environment (or a .env file loaded before `Config::load`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// Shared secret configured on the repository webhook.
    pub webhook_secret: Option<String>,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    /// Leave a short comment on the PR once the review reached Slack.
    #[serde(default)]
    pub comment_on_pr: bool,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            webhook_secret: None,
            api_url: default_github_api_url(),
            comment_on_pr: false,
        }
    }
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_llm_api_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackConfig {
    /// Incoming webhook URL of the target channel.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    /// Diff lines sent to the model; the rest is cut off with a marker line.
    #[serde(default = "default_max_diff_lines")]
    pub max_diff_lines: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_diff_lines: default_max_diff_lines(),
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_llm_api_url() -> String {
    "https://api.upstage.ai/v1/solar/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "solar-pro".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_diff_lines() -> usize {
    500
}

impl Config {
    /// Load configuration from `path`, or from .pr-review-agent.toml in the
    /// current directory when no path is given, then fill unset values from
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill values the file left unset from `lookup`. File values win.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fill(&mut self.github.token, lookup("GITHUB_TOKEN"));
        fill(&mut self.github.webhook_secret, lookup("GITHUB_WEBHOOK_SECRET"));
        fill(
            &mut self.llm.api_key,
            lookup("LLM_API_KEY").or_else(|| lookup("UPSTAGE_API_KEY")),
        );
        fill(&mut self.slack.webhook_url, lookup("SLACK_WEBHOOK_URL"));

        if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        Ok(())
    }

    /// Check that every secret the service needs is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("GITHUB_TOKEN", &self.github.token),
            ("GITHUB_WEBHOOK_SECRET", &self.github.webhook_secret),
            ("LLM_API_KEY", &self.llm.api_key),
            ("SLACK_WEBHOOK_URL", &self.slack.webhook_url),
        ];

        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingRequired(missing))
        }
    }

    pub fn github_token(&self) -> &str {
        self.github.token.as_deref().unwrap_or_default()
    }

    pub fn webhook_secret(&self) -> &str {
        self.github.webhook_secret.as_deref().unwrap_or_default()
    }

    pub fn llm_api_key(&self) -> &str {
        self.llm.api_key.as_deref().unwrap_or_default()
    }

    pub fn slack_webhook_url(&self) -> &str {
        self.slack.webhook_url.as_deref().unwrap_or_default()
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.as_deref().map_or(true, str::is_empty) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            *slot = Some(value);
        }
    }
}

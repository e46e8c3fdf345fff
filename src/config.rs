use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Groq,
    Openrouter,
    Ollama,
    Openai,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Groq => write!(f, "groq"),
            LlmProvider::Openrouter => write!(f, "openrouter"),
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::Openai => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            base_url: String::new(),
            api_key: String::new(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        match self.provider {
            LlmProvider::Groq => "https://api.groq.com/openai/v1",
            LlmProvider::Openrouter => "https://openrouter.ai/api/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
            LlmProvider::Openai => "https://api.openai.com/v1",
        }
    }
}

/// Credentials and allow-list for one platform router.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PlatformConfig {
    #[serde(default, alias = "token")]
    pub credential_token: String,
    /// Single guild the router answers in (guild platform only)
    #[serde(default)]
    pub allowed_guild_id: Option<String>,
    #[serde(default)]
    pub allowed_conversation_ids: BTreeSet<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Listen address; empty disables the dashboard endpoint
    #[serde(default = "default_dashboard_bind")]
    pub bind: String,
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: default_dashboard_bind(),
            reply_timeout_secs: default_reply_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub discord: PlatformConfig,
    #[serde(default)]
    pub telegram: PlatformConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_dashboard_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_reply_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Load the optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    /// Overlay environment-style keys. Blank values count as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(|v| non_blank(&v));

        if let Some(token) = get("DISCORD_API_TOKEN") {
            self.discord.credential_token = token;
        }
        if let Some(guild) = get("DISCORD_GUILD_ID") {
            self.discord.allowed_guild_id = Some(guild);
        }
        if let Some(ids) = get("DISCORD_CHANNEL_IDS") {
            self.discord.allowed_conversation_ids = parse_id_list(&ids);
        }

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.credential_token = token;
        }
        if let Some(ids) = get("TELEGRAM_CHANNEL_IDS") {
            self.telegram.allowed_conversation_ids = parse_id_list(&ids);
        }

        if let Some(key) = get("GROQ_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = get("LLM_BASE_URL") {
            self.llm.base_url = url;
        }

        if let Some(bind) = lookup("DASHBOARD_BIND") {
            self.dashboard.bind = bind.trim().to_string();
        }
    }
}

/// Split a comma-separated id list, dropping blanks.
pub fn parse_id_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::inbound::{Platform, DASHBOARD_TAG};

/// A backend that turns a prompt into reply text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Prompt template, chosen by source platform and dashboard origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Discord,
    Telegram,
    Dashboard,
}

impl PromptKind {
    pub fn for_origin(platform: Platform, dashboard_origin: bool) -> Self {
        match (platform, dashboard_origin) {
            (_, true) => PromptKind::Dashboard,
            (Platform::Discord, false) => PromptKind::Discord,
            (Platform::Telegram, false) => PromptKind::Telegram,
        }
    }

    pub fn render(&self, text: &str) -> String {
        match self {
            PromptKind::Discord => format!(
                "Formulate a concise and helpful response for a Discord user based on the following text: \"{}\"",
                text
            ),
            PromptKind::Telegram => format!(
                "Respond concisely and supportively to a Telegram user based on the following text: \"{}\"",
                text
            ),
            PromptKind::Dashboard => format!(
                "Formulate a concise and helpful response for a dashboard user based on the following text: \"{}\"",
                text
            ),
        }
    }

    /// Source tag carried by the reply on the outbound topic.
    pub fn source_tag(&self) -> &'static str {
        match self {
            PromptKind::Discord => Platform::Discord.tag(),
            PromptKind::Telegram => Platform::Telegram.tag(),
            PromptKind::Dashboard => DASHBOARD_TAG,
        }
    }
}

/// Wraps the language model with the fixed prompt templates.
#[derive(Clone)]
pub struct ReplyGenerator {
    model: Arc<dyn LanguageModel>,
}

impl ReplyGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Single backend call. No retry, no caching.
    pub async fn generate(&self, kind: PromptKind, source_text: &str) -> Result<String, GenerationError> {
        self.model.complete(&kind.render(source_text)).await
    }
}

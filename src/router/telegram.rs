use tracing::{debug, info, warn};

use super::{PlatformRouter, ReplyRequest, RouteOutcome};
use crate::config::PlatformConfig;
use crate::inbound::TelegramInbound;
use crate::reply::PromptKind;
use crate::scope::{self, Rejection};

pub(super) fn log_scope(config: &PlatformConfig) {
    if config.allowed_conversation_ids.is_empty() {
        warn!("TELEGRAM_CHANNEL_IDS not set or empty; no Telegram chats will be answered");
    } else {
        let ids: Vec<&str> = config
            .allowed_conversation_ids
            .iter()
            .map(String::as_str)
            .collect();
        info!("Telegram router configured for chats: {}", ids.join(", "));
    }
}

/// Allow-list filter, then reply into the admitted chat.
pub(super) async fn route(router: &PlatformRouter, msg: TelegramInbound) -> RouteOutcome {
    debug!(
        "Parsed Telegram message: room {}, chat {}, text {:?}",
        msg.conversation_ref.as_deref().unwrap_or("N/A"),
        msg.chat.chat_id.as_deref().unwrap_or("N/A"),
        msg.text
    );

    let chat_id = match scope::admit_chat(
        router.config(),
        &msg.chat,
        msg.text.as_deref(),
        msg.conversation_ref.as_deref(),
    ) {
        Ok(chat_id) => chat_id.to_string(),
        Err(Rejection::MissingFields) => {
            warn!("Telegram message missing room id, chat id or text; skipping reply");
            return RouteOutcome::Rejected(Rejection::MissingFields);
        }
        Err(rejection) => {
            info!("Ignoring Telegram message: {}", rejection);
            return RouteOutcome::Rejected(rejection);
        }
    };

    let text = msg.text.unwrap_or_default();
    info!(
        "Telegram message from chat {}: \"{}\" (sender: {})",
        chat_id,
        text,
        msg.sender_name.as_deref().unwrap_or("unknown")
    );

    router
        .reply(
            PromptKind::for_origin(router.platform(), false),
            ReplyRequest {
                prompt_source_text: text,
                destination_ref: chat_id,
            },
        )
        .await
}

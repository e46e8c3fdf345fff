use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::bus::{EventBus, OutboundMessage};
use crate::config::PlatformConfig;
use crate::inbound::TELEGRAM_TAG;
use crate::platform::{deliver_replies, room_id_for, split_message};

/// Telegram rejects messages above 4096 chars
const MESSAGE_LIMIT: usize = 4000;

/// Run the Telegram connector: chat messages in, `telegram` replies out.
pub async fn run(config: PlatformConfig, bus: Arc<EventBus>) -> Result<()> {
    let bot = Bot::new(&config.credential_token);

    info!("Starting Telegram connector...");

    let outbound_bot = bot.clone();
    let replies = bus.subscribe_outbound();
    tokio::spawn(deliver_replies(TELEGRAM_TAG, replies, move |reply| {
        let bot = outbound_bot.clone();
        async move { send_reply(&bot, reply).await }
    }));

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![bus])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, bus: Arc<EventBus>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t,
        None => return Ok(()),
    };

    let (first_name, username) = match msg.from.as_ref() {
        Some(user) => (Some(user.first_name.as_str()), user.username.as_deref()),
        None => (None, None),
    };

    info!(
        "Telegram message in chat {} from {}: {}",
        msg.chat.id.0,
        first_name.unwrap_or("unknown"),
        text
    );

    let payload = inbound_payload(msg.chat.id.0, text, first_name, username);
    if let Err(e) = bus.publish_inbound(payload) {
        warn!("Dropping Telegram message: {}", e);
    }

    Ok(())
}

/// Build the "message received" payload for a Telegram chat message.
/// `fromId` carries the chat id so the reply goes back to the same chat.
pub fn inbound_payload(
    chat_id: i64,
    text: &str,
    first_name: Option<&str>,
    username: Option<&str>,
) -> Value {
    json!({
        "client": TELEGRAM_TAG,
        "message": {
            "roomId": room_id_for(TELEGRAM_TAG, &chat_id.to_string()),
            "content": { "text": text, "source": TELEGRAM_TAG },
            "metadata": {
                "fromId": chat_id,
                "entityName": first_name,
                "entityUserName": username,
            }
        }
    })
}

async fn send_reply(bot: &Bot, reply: OutboundMessage) -> Result<()> {
    let chat_id = ChatId(
        reply
            .room_id
            .parse::<i64>()
            .with_context(|| format!("Invalid Telegram chat id '{}'", reply.room_id))?,
    );

    for chunk in split_message(reply.text(), MESSAGE_LIMIT) {
        bot.send_message(chat_id, chunk)
            .await
            .context("Failed to send Telegram message")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::InboundMessage;

    #[test]
    fn test_inbound_payload_normalizes_as_telegram() {
        let payload = inbound_payload(-1001, "hello", Some("Bob"), Some("bob_tg"));
        let InboundMessage::Telegram(msg) = InboundMessage::normalize(&payload) else {
            panic!("expected telegram message");
        };
        assert_eq!(msg.chat.chat_id.as_deref(), Some("-1001"));
        assert_eq!(msg.text.as_deref(), Some("hello"));
        assert_eq!(msg.sender_name.as_deref(), Some("Bob"));
        assert_eq!(
            msg.conversation_ref,
            Some(room_id_for("telegram", "-1001"))
        );
    }

    #[test]
    fn test_inbound_payload_username_fallback() {
        let payload = inbound_payload(5, "hey", None, Some("anon"));
        let InboundMessage::Telegram(msg) = InboundMessage::normalize(&payload) else {
            panic!("expected telegram message");
        };
        assert_eq!(msg.sender_name.as_deref(), Some("anon"));
    }
}

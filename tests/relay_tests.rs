use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;

use relaybot::bus::{EventBus, OutboundMessage};
use relaybot::config::{parse_id_list, PlatformConfig};
use relaybot::error::GenerationError;
use relaybot::inbound::Platform;
use relaybot::platform::{dashboard, discord, telegram};
use relaybot::reply::{LanguageModel, ReplyGenerator};
use relaybot::router::PlatformRouter;

/// Replies with the prompt it was given, or fails when the prompt
/// contains "boom".
struct ScriptedModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("boom") {
            return Err(GenerationError::Api {
                status: 503,
                body: "overloaded".to_string(),
            });
        }
        Ok(format!("re: {}", prompt))
    }
}

struct Relay {
    bus: Arc<EventBus>,
    model: Arc<ScriptedModel>,
    outbound: broadcast::Receiver<OutboundMessage>,
}

fn start_relay(discord_guild: Option<&str>, telegram_chats: &str) -> Relay {
    let bus = Arc::new(EventBus::new(64));
    let model = Arc::new(ScriptedModel {
        prompts: Mutex::new(Vec::new()),
    });
    let generator = ReplyGenerator::new(model.clone());
    let outbound = bus.subscribe_outbound();

    let configs = [
        (
            Platform::Discord,
            PlatformConfig {
                credential_token: "discord-token".to_string(),
                allowed_guild_id: discord_guild.map(str::to_string),
                ..Default::default()
            },
        ),
        (
            Platform::Telegram,
            PlatformConfig {
                credential_token: "telegram-token".to_string(),
                allowed_conversation_ids: parse_id_list(telegram_chats),
                ..Default::default()
            },
        ),
    ];
    for (platform, config) in configs {
        let router = Arc::new(PlatformRouter::new(
            platform,
            config,
            generator.clone(),
            bus.clone(),
        ));
        let inbound = bus.subscribe_inbound();
        tokio::spawn(router.run(inbound));
    }

    Relay {
        bus,
        model,
        outbound,
    }
}

/// Collect outbound messages until the topic stays quiet.
async fn drain(outbound: &mut broadcast::Receiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut sent = Vec::new();
    while let Ok(Ok(msg)) = tokio::time::timeout(Duration::from_millis(200), outbound.recv()).await
    {
        sent.push(msg);
    }
    sent
}

#[tokio::test]
async fn test_discord_message_in_foreign_guild_gets_no_reply() {
    let mut relay = start_relay(Some("G1"), "100");

    relay
        .bus
        .publish_inbound(discord::inbound_payload(Some(2), 9, 1, "hi", "alice").unwrap())
        .unwrap();

    assert!(drain(&mut relay.outbound).await.is_empty());
    assert!(relay.model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_discord_message_gets_one_reply_in_its_channel() {
    let mut relay = start_relay(Some("1"), "100");

    relay
        .bus
        .publish_inbound(discord::inbound_payload(Some(1), 9, 1, "hi", "alice").unwrap())
        .unwrap();

    let sent = drain(&mut relay.outbound).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].source(), "discord");
    assert_eq!(sent[0].room_id, "9");
    assert!(sent[0].text().contains("Discord user"));
}

#[tokio::test]
async fn test_telegram_listed_chat_gets_one_reply() {
    let mut relay = start_relay(None, "100,200");

    relay
        .bus
        .publish_inbound(telegram::inbound_payload(100, "hello", Some("Bob"), None))
        .unwrap();

    let sent = drain(&mut relay.outbound).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].source(), "telegram");
    assert_eq!(sent[0].room_id, "100");

    let prompts = relay.model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(
        prompts[0],
        "Respond concisely and supportively to a Telegram user based on the following text: \"hello\""
    );
}

#[tokio::test]
async fn test_telegram_unlisted_chat_gets_no_reply() {
    let mut relay = start_relay(None, "100,200");

    relay
        .bus
        .publish_inbound(telegram::inbound_payload(300, "hello", Some("Eve"), None))
        .unwrap();

    assert!(drain(&mut relay.outbound).await.is_empty());
}

#[tokio::test]
async fn test_generation_failure_produces_no_reply() {
    let mut relay = start_relay(None, "100");

    relay
        .bus
        .publish_inbound(telegram::inbound_payload(100, "boom", Some("Bob"), None))
        .unwrap();

    assert!(drain(&mut relay.outbound).await.is_empty());
    assert_eq!(relay.model.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dashboard_message_answered_by_each_router() {
    let mut relay = start_relay(Some("G1"), "");

    relay
        .bus
        .publish_inbound(dashboard::inbound_payload("dash-room", "status?", Some("ops")))
        .unwrap();

    let sent = drain(&mut relay.outbound).await;
    assert_eq!(sent.len(), 2);
    assert!(sent
        .iter()
        .all(|m| m.source() == "client_chat" && m.room_id == "dash-room"));
}

#[tokio::test]
async fn test_unknown_client_is_ignored() {
    let mut relay = start_relay(None, "100");

    relay
        .bus
        .publish_inbound(json!({ "client": "slack", "message": { "content": { "text": "hi" } } }))
        .unwrap();

    assert!(drain(&mut relay.outbound).await.is_empty());
}

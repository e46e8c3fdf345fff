use std::fmt;

use serde_json::Value;

use crate::extract::{self, ChatIdentifiers, GuildIdentifiers, PlatformIdentifiers};

pub const DISCORD_TAG: &str = "discord";
pub const TELEGRAM_TAG: &str = "telegram";
pub const DASHBOARD_TAG: &str = "client_chat";

/// Where an inbound message claims to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePlatform {
    Discord,
    Telegram,
    Dashboard,
    Unknown,
}

impl SourcePlatform {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(DISCORD_TAG) => SourcePlatform::Discord,
            Some(TELEGRAM_TAG) => SourcePlatform::Telegram,
            Some(DASHBOARD_TAG) => SourcePlatform::Dashboard,
            _ => SourcePlatform::Unknown,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            SourcePlatform::Discord => DISCORD_TAG,
            SourcePlatform::Telegram => TELEGRAM_TAG,
            SourcePlatform::Dashboard => DASHBOARD_TAG,
            SourcePlatform::Unknown => "unknown",
        }
    }
}

/// A platform a router can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Discord,
    Telegram,
}

impl Platform {
    pub fn tag(&self) -> &'static str {
        SourcePlatform::from(*self).tag()
    }
}

impl From<Platform> for SourcePlatform {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Discord => SourcePlatform::Discord,
            Platform::Telegram => SourcePlatform::Telegram,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Discord => write!(f, "Discord"),
            Platform::Telegram => write!(f, "Telegram"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordInbound {
    pub conversation_ref: Option<String>,
    pub text: String,
    pub sender_name: Option<String>,
    pub ids: GuildIdentifiers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramInbound {
    pub conversation_ref: Option<String>,
    pub text: Option<String>,
    pub sender_name: Option<String>,
    pub chat: ChatIdentifiers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardInbound {
    pub conversation_ref: Option<String>,
    pub text: String,
    pub sender_name: Option<String>,
}

/// An inbound payload after normalization, one variant per source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Discord(DiscordInbound),
    Telegram(TelegramInbound),
    Dashboard(DashboardInbound),
    Unknown { client: Option<String> },
}

impl InboundMessage {
    /// Normalize a "message received" payload.
    ///
    /// The source is `client`, falling back to `message.content.source`.
    /// The conversation ref is `message.roomId`, falling back to `roomId`.
    pub fn normalize(payload: &Value) -> Self {
        let message = payload.get("message").filter(|m| m.is_object());
        let client = str_at(payload, "/client")
            .or_else(|| message.and_then(|m| str_at(m, "/content/source")));
        let conversation_ref = message
            .and_then(|m| str_at(m, "/roomId"))
            .or_else(|| str_at(payload, "/roomId"))
            .map(str::to_string);

        match SourcePlatform::from_tag(client) {
            SourcePlatform::Discord => {
                let ids = match extract::extract(SourcePlatform::Discord, message) {
                    PlatformIdentifiers::Guild(ids) => ids,
                    _ => GuildIdentifiers::default(),
                };
                InboundMessage::Discord(DiscordInbound {
                    conversation_ref,
                    text: message
                        .and_then(|m| str_at(m, "/content/text"))
                        .unwrap_or_default()
                        .to_string(),
                    sender_name: message
                        .and_then(|m| {
                            str_at(m, "/metadata/entityName").or_else(|| str_at(m, "/senderName"))
                        })
                        .map(str::to_string),
                    ids,
                })
            }
            SourcePlatform::Telegram => {
                let chat = match extract::extract(SourcePlatform::Telegram, message) {
                    PlatformIdentifiers::Chat(chat) => chat,
                    _ => ChatIdentifiers::default(),
                };
                InboundMessage::Telegram(TelegramInbound {
                    conversation_ref,
                    text: message
                        .and_then(|m| str_at(m, "/content/text"))
                        .map(str::to_string),
                    sender_name: message
                        .and_then(|m| {
                            str_at(m, "/metadata/entityName")
                                .or_else(|| str_at(m, "/metadata/entityUserName"))
                        })
                        .map(str::to_string),
                    chat,
                })
            }
            SourcePlatform::Dashboard => {
                let dashboard = payload.get("payload");
                let text = match dashboard.and_then(|p| p.get("message")) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => str_at(other, "/text").unwrap_or_default().to_string(),
                    None => String::new(),
                };
                InboundMessage::Dashboard(DashboardInbound {
                    conversation_ref,
                    text,
                    sender_name: dashboard
                        .and_then(|p| str_at(p, "/senderName"))
                        .map(str::to_string),
                })
            }
            SourcePlatform::Unknown => InboundMessage::Unknown {
                client: client.map(str::to_string),
            },
        }
    }

    pub fn source(&self) -> SourcePlatform {
        match self {
            InboundMessage::Discord(_) => SourcePlatform::Discord,
            InboundMessage::Telegram(_) => SourcePlatform::Telegram,
            InboundMessage::Dashboard(_) => SourcePlatform::Dashboard,
            InboundMessage::Unknown { .. } => SourcePlatform::Unknown,
        }
    }
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_discord_payload() {
        let payload = json!({
            "client": "discord",
            "message": {
                "roomId": "room-1",
                "content": { "text": "hi", "url": "https://discord.com/channels/G1/C9/M1" },
                "metadata": { "entityName": "alice" }
            }
        });
        let InboundMessage::Discord(msg) = InboundMessage::normalize(&payload) else {
            panic!("expected discord message");
        };
        assert_eq!(msg.conversation_ref.as_deref(), Some("room-1"));
        assert_eq!(msg.text, "hi");
        assert_eq!(msg.sender_name.as_deref(), Some("alice"));
        assert_eq!(msg.ids.guild_id.as_deref(), Some("G1"));
        assert_eq!(msg.ids.channel_id.as_deref(), Some("C9"));
    }

    #[test]
    fn test_client_falls_back_to_content_source() {
        let payload = json!({
            "message": { "content": { "source": "telegram", "text": "yo" } }
        });
        assert_eq!(
            InboundMessage::normalize(&payload).source(),
            SourcePlatform::Telegram
        );
    }

    #[test]
    fn test_telegram_payload() {
        let payload = json!({
            "client": "telegram",
            "message": {
                "roomId": "room-2",
                "content": { "text": "hello" },
                "metadata": { "fromId": 100, "entityUserName": "bob_tg" }
            }
        });
        let InboundMessage::Telegram(msg) = InboundMessage::normalize(&payload) else {
            panic!("expected telegram message");
        };
        assert_eq!(msg.text.as_deref(), Some("hello"));
        assert_eq!(msg.chat.chat_id.as_deref(), Some("100"));
        assert_eq!(msg.sender_name.as_deref(), Some("bob_tg"));
    }

    #[test]
    fn test_telegram_missing_fields_stay_absent() {
        let payload = json!({ "client": "telegram", "message": "not an object" });
        let InboundMessage::Telegram(msg) = InboundMessage::normalize(&payload) else {
            panic!("expected telegram message");
        };
        assert_eq!(msg.conversation_ref, None);
        assert_eq!(msg.text, None);
        assert_eq!(msg.chat.chat_id, None);
    }

    #[test]
    fn test_dashboard_string_message() {
        let payload = json!({
            "client": "client_chat",
            "roomId": "dash-room",
            "payload": { "message": "status?", "senderName": "ops" }
        });
        assert_eq!(
            InboundMessage::normalize(&payload),
            InboundMessage::Dashboard(DashboardInbound {
                conversation_ref: Some("dash-room".into()),
                text: "status?".into(),
                sender_name: Some("ops".into()),
            })
        );
    }

    #[test]
    fn test_dashboard_object_message_and_missing_payload() {
        let payload = json!({
            "client": "client_chat",
            "roomId": "r",
            "payload": { "message": { "text": "from object" } }
        });
        let InboundMessage::Dashboard(msg) = InboundMessage::normalize(&payload) else {
            panic!("expected dashboard message");
        };
        assert_eq!(msg.text, "from object");

        let payload = json!({ "client": "client_chat", "roomId": "r" });
        let InboundMessage::Dashboard(msg) = InboundMessage::normalize(&payload) else {
            panic!("expected dashboard message");
        };
        assert_eq!(msg.text, "");
        assert_eq!(msg.sender_name, None);
    }

    #[test]
    fn test_unknown_client() {
        assert_eq!(
            InboundMessage::normalize(&json!({ "client": "slack" })),
            InboundMessage::Unknown {
                client: Some("slack".into())
            }
        );
        assert_eq!(
            InboundMessage::normalize(&json!(null)),
            InboundMessage::Unknown { client: None }
        );
    }

    #[test]
    fn test_platform_tags() {
        assert_eq!(Platform::Discord.tag(), "discord");
        assert_eq!(Platform::Telegram.tag(), "telegram");
        assert_eq!(SourcePlatform::from_tag(Some("client_chat")), SourcePlatform::Dashboard);
        assert_eq!(SourcePlatform::from_tag(None), SourcePlatform::Unknown);
    }
}

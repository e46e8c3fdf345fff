use serde_json::Value;

use crate::inbound::SourcePlatform;

/// Path marker expected right after the host in a Discord permalink.
const PERMALINK_MARKER: &str = "channels";

/// Guild and channel recovered from a Discord message permalink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildIdentifiers {
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
}

/// Chat id read from Telegram message metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatIdentifiers {
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformIdentifiers {
    Guild(GuildIdentifiers),
    Chat(ChatIdentifiers),
    None,
}

/// Recover platform-native identifiers from a raw `message` object.
///
/// Never fails: anything missing or malformed comes back as absent.
pub fn extract(platform: SourcePlatform, message: Option<&Value>) -> PlatformIdentifiers {
    match platform {
        SourcePlatform::Discord => {
            let url = message
                .and_then(|m| m.pointer("/content/url"))
                .and_then(Value::as_str);
            PlatformIdentifiers::Guild(discord_ids_from_permalink(url))
        }
        SourcePlatform::Telegram => {
            PlatformIdentifiers::Chat(telegram_chat_id(message.and_then(|m| m.get("metadata"))))
        }
        SourcePlatform::Dashboard | SourcePlatform::Unknown => PlatformIdentifiers::None,
    }
}

/// Parse `scheme://host/channels/{guild}/{channel}/{message}`.
pub fn discord_ids_from_permalink(url: Option<&str>) -> GuildIdentifiers {
    let Some(url) = url else {
        return GuildIdentifiers::default();
    };

    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() >= 7 && parts[3] == PERMALINK_MARKER {
        GuildIdentifiers {
            guild_id: non_empty(parts[4]),
            channel_id: non_empty(parts[5]),
        }
    } else {
        GuildIdentifiers::default()
    }
}

/// Read `fromId`, accepting either a string or an integer.
pub fn telegram_chat_id(metadata: Option<&Value>) -> ChatIdentifiers {
    let chat_id = match metadata.and_then(|m| m.get("fromId")) {
        Some(Value::String(s)) => non_empty(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    ChatIdentifiers { chat_id }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

use std::fmt;

use crate::config::PlatformConfig;
use crate::extract::{ChatIdentifiers, GuildIdentifiers};

/// Why a message was filtered out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Guild differs from the configured one
    ForeignGuild { guild_id: String },
    /// Chat is not on the allow-list
    UnlistedChat { chat_id: String },
    /// Chat id, text or conversation ref missing
    MissingFields,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ForeignGuild { guild_id } => write!(f, "unconfigured guild {}", guild_id),
            Rejection::UnlistedChat { chat_id } => write!(f, "unconfigured chat {}", chat_id),
            Rejection::MissingFields => write!(f, "missing chat id, text or conversation ref"),
        }
    }
}

/// Guild platform rule. Only a present guild that differs from a
/// configured guild is rejected; everything else is admitted.
pub fn admit_guild(config: &PlatformConfig, ids: &GuildIdentifiers) -> Result<(), Rejection> {
    match (config.allowed_guild_id.as_deref(), ids.guild_id.as_deref()) {
        (Some(allowed), Some(incoming)) if allowed != incoming => Err(Rejection::ForeignGuild {
            guild_id: incoming.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Channel platform rule. Admits only listed chats carrying text and a
/// conversation ref; an empty allow-list admits nothing.
///
/// Returns the admitted chat id, which is also the reply destination.
pub fn admit_chat<'a>(
    config: &PlatformConfig,
    chat: &'a ChatIdentifiers,
    text: Option<&str>,
    conversation_ref: Option<&str>,
) -> Result<&'a str, Rejection> {
    let Some(chat_id) = chat.chat_id.as_deref() else {
        return Err(Rejection::MissingFields);
    };
    if text.map_or(true, str::is_empty) || conversation_ref.is_none() {
        return Err(Rejection::MissingFields);
    }
    if !config.allowed_conversation_ids.contains(chat_id) {
        return Err(Rejection::UnlistedChat {
            chat_id: chat_id.to_string(),
        });
    }
    Ok(chat_id)
}

use tracing::{debug, error, info, warn};

use super::{PlatformRouter, ReplyRequest, RouteOutcome};
use crate::config::PlatformConfig;
use crate::inbound::DiscordInbound;
use crate::reply::PromptKind;
use crate::scope;

pub(super) fn log_scope(config: &PlatformConfig) {
    match config.allowed_guild_id.as_deref() {
        Some(guild) => info!("Discord router configured for guild {}", guild),
        None => warn!("DISCORD_GUILD_ID not set; Discord router will answer in every guild"),
    }
    if config.allowed_conversation_ids.is_empty() {
        info!("No Discord channel ids configured");
    } else {
        let ids: Vec<&str> = config
            .allowed_conversation_ids
            .iter()
            .map(String::as_str)
            .collect();
        info!("Discord channel ids configured: {}", ids.join(", "));
    }
}

/// Guild filter, then reply into the channel taken from the permalink.
pub(super) async fn route(router: &PlatformRouter, msg: DiscordInbound) -> RouteOutcome {
    let guild = msg.ids.guild_id.as_deref().unwrap_or("N/A");
    let channel = msg.ids.channel_id.as_deref().unwrap_or("N/A");
    debug!(
        "Parsed Discord message: room {}, guild {}, channel {}",
        msg.conversation_ref.as_deref().unwrap_or("N/A"),
        guild,
        channel
    );

    if let Err(rejection) = scope::admit_guild(router.config(), &msg.ids) {
        info!("Ignoring Discord message: {}", rejection);
        return RouteOutcome::Rejected(rejection);
    }

    info!(
        "Discord message from guild {} (channel {}): \"{}\" (sender: {})",
        guild,
        channel,
        msg.text,
        msg.sender_name.as_deref().unwrap_or("unknown")
    );

    let Some(channel_id) = msg.ids.channel_id else {
        error!("Could not determine Discord channel id for reply");
        return RouteOutcome::Undeliverable;
    };

    router
        .reply(
            PromptKind::for_origin(router.platform(), false),
            ReplyRequest {
                prompt_source_text: msg.text,
                destination_ref: channel_id,
            },
        )
        .await
}

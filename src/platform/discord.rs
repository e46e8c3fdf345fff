use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde_json::{json, Value};
use serenity::all::{
    ChannelId, Client, Context, CreateMessage, EventHandler, GatewayIntents, Http, Message, Ready,
};
use serenity::async_trait;
use tracing::{info, warn};

use crate::bus::{EventBus, OutboundMessage};
use crate::config::PlatformConfig;
use crate::inbound::DISCORD_TAG;
use crate::platform::{deliver_replies, room_id_for, split_message};

/// Discord caps message content at 2000 chars
const MESSAGE_LIMIT: usize = 2000;

struct Handler {
    bus: Arc<EventBus>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            "Discord connector ready as {} ({} guilds)",
            ready.user.name,
            ready.guilds.len()
        );
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        // Skip bot messages to prevent loops
        if msg.author.bot {
            return;
        }

        // Direct messages carry no permalink, so no reply could reach them
        let Some(payload) = inbound_payload(
            msg.guild_id.map(|g| g.get()),
            msg.channel_id.get(),
            msg.id.get(),
            &msg.content,
            &msg.author.name,
        ) else {
            info!("Skipping Discord direct message from {}", msg.author.name);
            return;
        };
        if let Err(e) = self.bus.publish_inbound(payload) {
            warn!("Dropping Discord message: {}", e);
        }
    }
}

/// Run the Discord connector: guild messages in, `discord` replies out.
pub async fn run(config: PlatformConfig, bus: Arc<EventBus>) -> Result<()> {
    info!("Starting Discord connector...");

    let http = Arc::new(Http::new(&config.credential_token));
    let replies = bus.subscribe_outbound();
    tokio::spawn(deliver_replies(DISCORD_TAG, replies, move |reply| {
        let http = http.clone();
        async move { send_reply(&http, reply).await }
    }));

    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.credential_token, intents)
        .event_handler(Handler { bus })
        .await
        .context("Failed to build Discord client")?;

    client.start().await.context("Discord client stopped")?;
    Ok(())
}

/// Permalink of a guild message.
pub fn permalink(guild_id: u64, channel_id: u64, message_id: u64) -> String {
    format!(
        "https://discord.com/channels/{}/{}/{}",
        guild_id, channel_id, message_id
    )
}

/// Build the "message received" payload for a guild message. Direct
/// messages (no guild) yield `None`.
pub fn inbound_payload(
    guild_id: Option<u64>,
    channel_id: u64,
    message_id: u64,
    text: &str,
    author: &str,
) -> Option<Value> {
    let guild_id = guild_id?;
    Some(json!({
        "client": DISCORD_TAG,
        "message": {
            "roomId": room_id_for(DISCORD_TAG, &channel_id.to_string()),
            "content": {
                "text": text,
                "source": DISCORD_TAG,
                "url": permalink(guild_id, channel_id, message_id),
            },
            "metadata": { "entityName": author }
        }
    }))
}

async fn send_reply(http: &Http, reply: OutboundMessage) -> Result<()> {
    let id = reply
        .room_id
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .with_context(|| format!("Invalid Discord channel id '{}'", reply.room_id))?;
    let channel = ChannelId::new(id);

    for chunk in split_message(reply.text(), MESSAGE_LIMIT) {
        channel
            .send_message(http, CreateMessage::new().content(chunk))
            .await
            .context("Failed to send Discord message")?;
    }
    Ok(())
}

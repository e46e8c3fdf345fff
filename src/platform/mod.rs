pub mod dashboard;
pub mod discord;
pub mod telegram;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bus::OutboundMessage;

/// Stable runtime room id for a platform-native conversation.
pub fn room_id_for(platform: &str, native_id: &str) -> String {
    let name = format!("{}:{}", platform, native_id);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

/// Split a reply into chunks of at most `max_chars` characters (Telegram
/// and Discord both count characters, not bytes). A chunk ends after the
/// last newline in its window, else after the last space, else at the
/// window edge.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    // `nth(max_chars)` exists only while more than `max_chars` chars remain
    while let Some((window_end, _)) = rest.char_indices().nth(max_chars) {
        let window = &rest[..window_end];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map_or(window_end, |pos| pos + 1);
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk.to_string());
        rest = tail;
    }
    chunks.push(rest.to_string());

    chunks
}

/// Drain the outbound topic, delivering replies tagged `source` with
/// `send`. Delivery failures are logged and the loop carries on.
pub(crate) async fn deliver_replies<F, Fut>(
    source: &'static str,
    mut replies: broadcast::Receiver<OutboundMessage>,
    send: F,
) where
    F: Fn(OutboundMessage) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    loop {
        match replies.recv().await {
            Ok(reply) if reply.source() == source => {
                let room_id = reply.room_id.clone();
                if let Err(e) = send(reply).await {
                    error!("Failed to deliver {} reply to {}: {:#}", source, room_id, e);
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => {
                warn!("{} connector outbound lagged, skipped {} replies", source, n);
            }
            Err(RecvError::Closed) => {
                info!("Bus closed, {} connector outbound stopping", source);
                break;
            }
        }
    }
}

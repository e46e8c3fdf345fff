use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bus::{EventBus, OutboundMessage};
use crate::config::DashboardConfig;
use crate::inbound::DASHBOARD_TAG;

#[derive(Clone)]
pub struct DashboardState {
    bus: Arc<EventBus>,
    reply_timeout: Duration,
}

impl DashboardState {
    pub fn new(bus: Arc<EventBus>, reply_timeout: Duration) -> Self {
        Self { bus, reply_timeout }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub room_id: String,
    pub text: String,
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/chat", post(chat))
        .with_state(state)
}

/// Serve the dashboard chat endpoint until the listener fails.
pub async fn run(config: DashboardConfig, bus: Arc<EventBus>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind dashboard to {}", config.bind))?;

    info!("Dashboard listening on http://{}", config.bind);

    let state = DashboardState::new(bus, Duration::from_secs(config.reply_timeout_secs));
    axum::serve(listener, router(state))
        .await
        .context("Dashboard server error")?;

    Ok(())
}

/// Publish a dashboard message and wait for the first reply to its room.
pub async fn chat(
    State(state): State<DashboardState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, StatusCode> {
    let room_id = request
        .room_id
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // Subscribe before publishing so a fast reply cannot slip past
    let replies = state.bus.subscribe_outbound();

    let payload = inbound_payload(&room_id, &request.message, request.sender_name.as_deref());
    if let Err(e) = state.bus.publish_inbound(payload) {
        warn!("Dashboard message not routed: {}", e);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    match tokio::time::timeout(state.reply_timeout, await_reply(replies, &room_id)).await {
        Ok(Some(reply)) => Ok(Json(ChatReply {
            room_id,
            text: reply.message.text,
        })),
        Ok(None) => Err(StatusCode::SERVICE_UNAVAILABLE),
        Err(_) => {
            warn!("No dashboard reply for room {} within {:?}", room_id, state.reply_timeout);
            Err(StatusCode::GATEWAY_TIMEOUT)
        }
    }
}

/// Build the "message received" payload for a dashboard message.
pub fn inbound_payload(room_id: &str, message: &str, sender_name: Option<&str>) -> Value {
    json!({
        "client": DASHBOARD_TAG,
        "roomId": room_id,
        "payload": { "message": message, "senderName": sender_name }
    })
}

async fn await_reply(
    mut replies: broadcast::Receiver<OutboundMessage>,
    room_id: &str,
) -> Option<OutboundMessage> {
    loop {
        match replies.recv().await {
            Ok(reply) if reply.source() == DASHBOARD_TAG && reply.room_id == room_id => {
                return Some(reply);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => {
                warn!("Dashboard reply wait lagged, skipped {} replies", n);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

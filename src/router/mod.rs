mod discord;
mod telegram;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::bus::{EventBus, InboundPayload, OutboundMessage};
use crate::config::PlatformConfig;
use crate::inbound::{DashboardInbound, InboundMessage, Platform};
use crate::reply::{PromptKind, ReplyGenerator};
use crate::scope::Rejection;

/// Terminal state of one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Emitted { room_id: String },
    Rejected(Rejection),
    /// Admitted but no destination could be derived
    Undeliverable,
    GenerationFailed,
    EmitFailed,
    /// Unknown source or another platform's message
    Ignored,
}

/// Request handed to the platform-specific reply step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub prompt_source_text: String,
    pub destination_ref: String,
}

/// Routes inbound events for one platform plus the dashboard.
///
/// Each event gets at most one generation call and one emission.
pub struct PlatformRouter {
    platform: Platform,
    config: PlatformConfig,
    generator: ReplyGenerator,
    bus: Arc<EventBus>,
}

impl PlatformRouter {
    pub fn new(
        platform: Platform,
        config: PlatformConfig,
        generator: ReplyGenerator,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            platform,
            config,
            generator,
            bus,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Startup diagnostics for the configured allow-list.
    pub fn log_scope(&self) {
        match self.platform {
            Platform::Discord => discord::log_scope(&self.config),
            Platform::Telegram => telegram::log_scope(&self.config),
        }
    }

    /// Consume the inbound topic until the bus closes. Each event runs on
    /// its own task so a slow generation only stalls that event.
    pub async fn run(self: Arc<Self>, mut inbound: broadcast::Receiver<InboundPayload>) {
        info!("{} router listening for messages", self.platform);
        loop {
            match inbound.recv().await {
                Ok(payload) => {
                    let router = Arc::clone(&self);
                    tokio::spawn(async move {
                        let outcome = router.handle(&payload).await;
                        debug!("{} router outcome: {:?}", router.platform, outcome);
                    });
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("{} router lagged, skipped {} messages", self.platform, n);
                }
                Err(RecvError::Closed) => {
                    info!("Bus closed, {} router shutting down", self.platform);
                    break;
                }
            }
        }
    }

    /// Route one "message received" payload to a terminal outcome.
    pub async fn handle(&self, payload: &Value) -> RouteOutcome {
        let inbound = InboundMessage::normalize(payload);
        debug!(
            "{} router received message from client {}",
            self.platform,
            inbound.source().tag()
        );

        match (self.platform, inbound) {
            (Platform::Discord, InboundMessage::Discord(msg)) => discord::route(self, msg).await,
            (Platform::Telegram, InboundMessage::Telegram(msg)) => telegram::route(self, msg).await,
            (_, InboundMessage::Dashboard(msg)) => self.route_dashboard(msg).await,
            (_, other) => {
                let client = match &other {
                    InboundMessage::Unknown { client } => client.as_deref().unwrap_or("<none>"),
                    known => known.source().tag(),
                };
                warn!(
                    "{} router received message from unknown client source: {}",
                    self.platform, client
                );
                RouteOutcome::Ignored
            }
        }
    }

    async fn route_dashboard(&self, msg: DashboardInbound) -> RouteOutcome {
        info!(
            "{} router handling dashboard message from {}: \"{}\" (room: {})",
            self.platform,
            msg.sender_name.as_deref().unwrap_or("unknown"),
            msg.text,
            msg.conversation_ref.as_deref().unwrap_or("N/A")
        );

        let Some(room) = msg.conversation_ref else {
            error!("{} router could not determine dashboard room for reply", self.platform);
            return RouteOutcome::Undeliverable;
        };

        let kind = PromptKind::for_origin(self.platform, true);
        self.reply(
            kind,
            ReplyRequest {
                prompt_source_text: msg.text,
                destination_ref: room,
            },
        )
        .await
    }

    /// Generate a reply and emit it once on the outbound topic.
    async fn reply(&self, kind: PromptKind, request: ReplyRequest) -> RouteOutcome {
        let text = match self
            .generator
            .generate(kind, &request.prompt_source_text)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!("{} router failed to generate {:?} reply: {}", self.platform, kind, e);
                return RouteOutcome::GenerationFailed;
            }
        };
        debug!("{} router generated {:?} reply: {}", self.platform, kind, text);

        let outbound = OutboundMessage::new(text, kind.source_tag(), request.destination_ref);
        let room_id = outbound.room_id.clone();
        match self.bus.emit(outbound) {
            Ok(_) => {
                info!(
                    "{} router sent {} reply to {}",
                    self.platform,
                    kind.source_tag(),
                    room_id
                );
                RouteOutcome::Emitted { room_id }
            }
            Err(e) => {
                error!(
                    "{} router failed to send {} reply to {}: {}",
                    self.platform,
                    kind.source_tag(),
                    room_id,
                    e
                );
                RouteOutcome::EmitFailed
            }
        }
    }
}

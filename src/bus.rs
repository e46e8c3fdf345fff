use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::EmissionError;

/// Raw "message received" payload as delivered by a connector.
pub type InboundPayload = Arc<Value>;

/// Body of a "message sent" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentContent {
    pub text: String,
    pub source: String,
}

/// A reply leaving the relay, addressed to a platform-native destination.
///
/// Serializes as `{ "message": { "text", "source" }, "roomId" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub message: SentContent,
    #[serde(rename = "roomId")]
    pub room_id: String,
}

impl OutboundMessage {
    pub fn new(text: impl Into<String>, source: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            message: SentContent {
                text: text.into(),
                source: source.into(),
            },
            room_id: room_id.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.message.text
    }

    pub fn source(&self) -> &str {
        &self.message.source
    }
}

/// In-process event bus with one inbound and one outbound topic.
///
/// Routers subscribe to the inbound topic and emit on the outbound topic;
/// connectors do the reverse.
///
/// [`EventBus::close`] drops the inbound sender, which ends every router's
/// receive loop once queued messages are drained.
pub struct EventBus {
    inbound: Mutex<Option<broadcast::Sender<InboundPayload>>>,
    outbound: broadcast::Sender<OutboundMessage>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (inbound, _) = broadcast::channel(capacity);
        let (outbound, _) = broadcast::channel(capacity);
        Self {
            inbound: Mutex::new(Some(inbound)),
            outbound,
        }
    }

    fn inbound_sender(&self) -> Option<broadcast::Sender<InboundPayload>> {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribe to received messages. After [`EventBus::close`] the
    /// returned receiver reports `Closed` straight away.
    pub fn subscribe_inbound(&self) -> broadcast::Receiver<InboundPayload> {
        match self.inbound_sender() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Stop accepting received messages.
    pub fn close(&self) {
        let closed = self
            .inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if closed.is_some() {
            info!("Inbound topic closed");
        }
    }

    pub fn subscribe_outbound(&self) -> broadcast::Receiver<OutboundMessage> {
        self.outbound.subscribe()
    }

    /// Publish a received message. Returns how many routers will see it.
    pub fn publish_inbound(&self, payload: Value) -> Result<usize, EmissionError> {
        let sender = self
            .inbound_sender()
            .ok_or(EmissionError::Closed { topic: "inbound" })?;
        sender
            .send(Arc::new(payload))
            .map_err(|_| EmissionError::NoSubscribers { topic: "inbound" })
    }

    /// Emit a reply. Fails when no connector is listening.
    pub fn emit(&self, message: OutboundMessage) -> Result<usize, EmissionError> {
        self.outbound
            .send(message)
            .map_err(|_| EmissionError::NoSubscribers { topic: "outbound" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_wire_shape() {
        let msg = OutboundMessage::new("hi there", "discord", "C9");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({ "message": { "text": "hi there", "source": "discord" }, "roomId": "C9" })
        );
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(8);
        let err = bus.emit(OutboundMessage::new("x", "telegram", "1")).unwrap_err();
        assert_eq!(err, EmissionError::NoSubscribers { topic: "outbound" });
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe_outbound();
        assert_eq!(bus.emit(OutboundMessage::new("x", "telegram", "1")).unwrap(), 1);
        let got = rx.recv().await.unwrap();
        assert_eq!(got.text(), "x");
        assert_eq!(got.source(), "telegram");
    }

    #[tokio::test]
    async fn test_inbound_publish_and_receive() {
        let bus = EventBus::new(8);
        assert!(bus.publish_inbound(json!({})).is_err());

        let mut rx = bus.subscribe_inbound();
        bus.publish_inbound(json!({ "client": "telegram" })).unwrap();
        let got = rx.recv().await.unwrap();
        assert_eq!(got["client"], "telegram");
    }

    #[tokio::test]
    async fn test_close_ends_inbound_topic() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe_inbound();
        bus.publish_inbound(json!({ "client": "telegram" })).unwrap();

        bus.close();

        // Queued messages still drain before the close is observed
        assert!(rx.recv().await.is_ok());
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert_eq!(
            bus.publish_inbound(json!({})).unwrap_err(),
            EmissionError::Closed { topic: "inbound" }
        );
        assert!(matches!(
            bus.subscribe_inbound().recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}

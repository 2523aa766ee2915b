//! Inbound message envelope, the produced internal message, and the
//! downstream channel seam.

use crate::ack::MqttAcknowledgment;
use crate::error::AdapterError;
use crate::headers::MessageHeaders;
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::v5::mqttbytes::v5::PublishProperties;
use rumqttc::v5::mqttbytes::QoS;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One arrived MQTT v5 message, as handed over by the external client.
///
/// Transient: created per arrival and consumed immediately by the delivery
/// pipeline, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMqttMessage {
    pub id: u16,
    pub qos: QoS,
    pub dup: bool,
    pub retain: bool,
    pub topic: String,
    pub payload: Bytes,
    pub properties: Option<PublishProperties>,
}

/// Payload of a produced internal message, per the configured mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Bytes),
    Envelope(InboundMqttMessage),
    Converted(serde_json::Value),
}

impl Payload {
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_envelope(&self) -> Option<&InboundMqttMessage> {
        match self {
            Payload::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    pub fn as_converted(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Converted(value) => Some(value),
            _ => None,
        }
    }
}

/// The message forwarded downstream by the delivery pipeline.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub payload: Payload,
    pub headers: MessageHeaders,
    /// Present only when the adapter runs with manual acknowledgments.
    pub acknowledgment: Option<Arc<MqttAcknowledgment>>,
}

/// Downstream delivery target for produced messages.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(&self, message: InboundMessage) -> Result<(), AdapterError>;
}

/// [`MessageChannel`] over a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct SenderChannel {
    sender: mpsc::Sender<InboundMessage>,
}

impl SenderChannel {
    pub fn new(sender: mpsc::Sender<InboundMessage>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl MessageChannel for SenderChannel {
    async fn send(&self, message: InboundMessage) -> Result<(), AdapterError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| AdapterError::Downstream(format!("channel closed: {e}")))
    }
}

//! Contract for the external MQTT v5 client collaborator
//!
//! The adapter never implements the wire protocol itself. It drives an
//! injected client through this trait and receives asynchronous
//! notifications through [`ClientEventHandler`], which the adapter
//! implements and the embedding code registers with the real client.

use crate::config::TopicSpec;
use crate::error::AdapterError;
use crate::message::InboundMqttMessage;
use async_trait::async_trait;
use rumqttc::v5::mqttbytes::v5::PublishProperties;
use rumqttc::v5::mqttbytes::QoS;
use thiserror::Error;

/// Failure reported by the external client for a single broker operation.
#[derive(Debug, Clone, Error)]
#[error("mqtt client error: {message}")]
pub struct ClientError {
    /// MQTT v5 reason code, when the broker supplied one
    pub reason_code: Option<u8>,
    pub message: String,
}

impl ClientError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            reason_code: None,
            message: message.into(),
        }
    }

    pub fn with_reason_code<S: Into<String>>(reason_code: u8, message: S) -> Self {
        Self {
            reason_code: Some(reason_code),
            message: message.into(),
        }
    }
}

/// Connection parameters handed to the client on `connect`.
///
/// Derived from the adapter configuration; the adapter owns the values and
/// they do not change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub server_uris: Vec<String>,
    pub client_id: String,
    pub automatic_reconnect: bool,
    pub manual_acks: bool,
}

/// Why the client reported a broker disconnect.
///
/// `cause` is absent for a clean, application-initiated disconnect; the
/// adapter only publishes a failure event when a cause is present.
#[derive(Debug, Clone, Default)]
pub struct DisconnectReason {
    pub reason_code: Option<u8>,
    pub cause: Option<ClientError>,
}

/// Black-box async MQTT v5 client.
///
/// Every operation runs to completion or error on its own; the adapter
/// bounds each call with the configured completion timeout. Implementations
/// must be safe to share behind an `Arc` across the adapter, the
/// acknowledgment handles, and the embedding code.
#[async_trait]
pub trait ManagedMqttClient: Send + Sync {
    async fn connect(&self, options: &ConnectOptions) -> Result<(), ClientError>;

    /// Subscribe to all given topic/QoS pairs in one request.
    async fn subscribe(&self, subscriptions: &[TopicSpec]) -> Result<(), ClientError>;

    /// Unsubscribe from all given topics in one request.
    async fn unsubscribe(&self, topics: &[String]) -> Result<(), ClientError>;

    async fn disconnect(&self) -> Result<(), ClientError>;

    /// Irreversible teardown of the client handle.
    async fn close(&self, force: bool) -> Result<(), ClientError>;

    /// Tell the client that processing of a received message is complete.
    /// Only meaningful when the connection runs with manual acknowledgments.
    async fn message_arrived_complete(&self, id: u16, qos: QoS) -> Result<(), ClientError>;
}

/// Callback interface the external client invokes on its own threads.
///
/// [`crate::adapter::MqttInboundAdapter`] implements this trait; register
/// the adapter with the client at wiring time. Handlers for infrastructure
/// notifications default to no-ops.
#[async_trait]
pub trait ClientEventHandler: Send + Sync {
    /// A message arrived on a subscribed topic. An `Err` return crosses
    /// back into the client, whose redelivery policy governs the outcome.
    async fn on_message(&self, message: InboundMqttMessage) -> Result<(), AdapterError>;

    /// The broker connection dropped, cleanly or otherwise.
    async fn on_disconnect(&self, reason: DisconnectReason);

    /// A protocol-level error occurred outside any adapter-initiated call.
    async fn on_error(&self, error: ClientError);

    async fn on_delivery_complete(&self, _token: u16) {}

    async fn on_connect_complete(&self, _reconnect: bool, _server_uri: &str) {}

    async fn on_auth_packet(&self, _reason_code: u8, _properties: Option<PublishProperties>) {}
}

//! Inbound MQTT v5 message-driven channel adapter
//!
//! Bridges an external MQTT v5 broker connection to an application-internal
//! message channel:
//! - Connection lifecycle (`start` connects and subscribes, `stop`
//!   unsubscribes and disconnects) with best-effort semantics and
//!   observable events
//! - Dynamic topic subscription management serialized against lifecycle
//!   operations under a single topic lock
//! - An inbound delivery pipeline mapping protocol properties to generic
//!   headers, selecting the payload shape, correlating manual
//!   acknowledgments, and forwarding downstream
//!
//! The wire protocol itself is an external collaborator behind the
//! [`client::ManagedMqttClient`] trait; the adapter implements
//! [`client::ClientEventHandler`] and is registered with the client at
//! wiring time.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use mqtt_channel_adapter::adapter::MqttInboundAdapter;
//! use mqtt_channel_adapter::config::{AdapterConfig, TopicSpec};
//! use mqtt_channel_adapter::message::SenderChannel;
//! use mqtt_channel_adapter::testing::MockMqttClient;
//! use rumqttc::v5::mqttbytes::QoS;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let mut config = AdapterConfig::new("mqtt://localhost:1883", "my-adapter");
//! config.topics = vec![TopicSpec::new("sensors/+/temperature", QoS::AtLeastOnce)];
//!
//! let client = Arc::new(MockMqttClient::new());
//! let (tx, mut rx) = tokio::sync::mpsc::channel(16);
//! let adapter = MqttInboundAdapter::builder(
//!     config,
//!     client,
//!     Arc::new(SenderChannel::new(tx)),
//! )
//! .build();
//!
//! adapter.start().await;
//! // messages arrive on `rx` as the client delivers them
//! adapter.stop().await;
//! # });
//! ```

pub mod ack;
pub mod adapter;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod event;
pub mod headers;
pub mod message;
pub mod observability;
pub mod testing;

pub use ack::MqttAcknowledgment;
pub use adapter::{AdapterState, MqttInboundAdapter, MqttInboundAdapterBuilder};
pub use client::{
    ClientError, ClientEventHandler, ConnectOptions, DisconnectReason, ManagedMqttClient,
};
pub use config::{AdapterConfig, ConfigError, TopicSpec};
pub use convert::{ConversionError, JsonMessageConverter, MessageConverter, PayloadMode};
pub use error::{AdapterError, AdapterResult};
pub use event::{AdapterEvent, EventPublisher};
pub use headers::{HeaderMapper, HeaderValue, MessageHeaders, MqttHeaderMapper};
pub use message::{InboundMessage, InboundMqttMessage, MessageChannel, Payload, SenderChannel};

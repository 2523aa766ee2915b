//! Adapter configuration
//!
//! Immutable after adapter construction. Loadable from TOML; every field
//! except the server URIs and client id has a sensible default.

use crate::convert::PayloadMode;
use rumqttc::v5::mqttbytes::QoS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One subscription: topic pattern plus requested QoS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicSpec {
    pub topic: String,
    #[serde(with = "qos_level", default = "default_qos")]
    pub qos: QoS,
}

impl TopicSpec {
    pub fn new<S: Into<String>>(topic: S, qos: QoS) -> Self {
        Self {
            topic: topic.into(),
            qos,
        }
    }
}

fn default_qos() -> QoS {
    QoS::AtLeastOnce
}

/// Serialize QoS as its numeric wire level (0, 1 or 2).
mod qos_level {
    use rumqttc::v5::mqttbytes::QoS;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(qos: &QoS, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*qos as u8)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<QoS, D::Error> {
        let level = u8::deserialize(deserializer)?;
        match level {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(serde::de::Error::custom(format!(
                "invalid QoS level {other}, expected 0, 1 or 2"
            ))),
        }
    }
}

/// Connection and behavior settings for one adapter instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdapterConfig {
    /// Broker URI(s); the client picks among them on (re)connect
    pub server_uris: Vec<String>,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// Let the client handle reconnects on its own (recommended)
    #[serde(default = "default_automatic_reconnect")]
    pub automatic_reconnect: bool,
    /// Upper bound for every broker round-trip, in milliseconds
    #[serde(default = "default_completion_timeout_ms")]
    pub completion_timeout_ms: u64,
    /// Defer arrival completion to the downstream consumer
    #[serde(default)]
    pub manual_acks: bool,
    /// Initial topic subscriptions established on start
    #[serde(default)]
    pub topics: Vec<TopicSpec>,
    /// Target payload shape for produced messages
    #[serde(default)]
    pub payload_mode: PayloadMode,
}

fn default_automatic_reconnect() -> bool {
    true
}

fn default_completion_timeout_ms() -> u64 {
    30_000
}

impl AdapterConfig {
    /// Minimal configuration for a single server URI, matching defaults for
    /// everything else.
    pub fn new<S: Into<String>, C: Into<String>>(server_uri: S, client_id: C) -> Self {
        Self {
            server_uris: vec![server_uri.into()],
            client_id: client_id.into(),
            automatic_reconnect: default_automatic_reconnect(),
            completion_timeout_ms: default_completion_timeout_ms(),
            manual_acks: false,
            topics: Vec::new(),
            payload_mode: PayloadMode::default(),
        }
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    /// Load and validate configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AdapterConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_uris.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "at least one server URI is required".to_string(),
            ));
        }
        for uri in &self.server_uris {
            Url::parse(uri).map_err(|_| ConfigError::InvalidServerUri(uri.clone()))?;
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "client_id must not be empty".to_string(),
            ));
        }
        if self.completion_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "completion_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid server URI: {0}")]
    InvalidServerUri(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

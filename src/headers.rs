//! Header mapping between MQTT v5 publish properties and generic headers
//!
//! [`MqttHeaderMapper`] is a pure translation of the fixed, known set of
//! MQTT v5 publish properties. The per-message fields (id, QoS, duplicate,
//! retained, topic) are not mapped here; the delivery pipeline always adds
//! them under the `names` constants.

use bytes::Bytes;
use rumqttc::v5::mqttbytes::v5::PublishProperties;
use std::collections::HashMap;

/// Well-known header names produced by the adapter.
pub mod names {
    pub const ID: &str = "mqtt_id";
    pub const RECEIVED_TOPIC: &str = "mqtt_receivedTopic";
    pub const RECEIVED_QOS: &str = "mqtt_receivedQos";
    pub const DUPLICATE: &str = "mqtt_duplicate";
    pub const RECEIVED_RETAINED: &str = "mqtt_receivedRetained";

    pub const CONTENT_TYPE: &str = "mqtt_contentType";
    pub const RESPONSE_TOPIC: &str = "mqtt_responseTopic";
    pub const CORRELATION_DATA: &str = "mqtt_correlationData";
    pub const MESSAGE_EXPIRY_INTERVAL: &str = "mqtt_messageExpiryInterval";
    pub const PAYLOAD_FORMAT_INDICATOR: &str = "mqtt_payloadFormatIndicator";
    pub const TOPIC_ALIAS: &str = "mqtt_topicAlias";
    pub const SUBSCRIPTION_IDENTIFIERS: &str = "mqtt_subscriptionIdentifiers";
}

/// Typed header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Bool(bool),
    Uint(u64),
    Str(String),
    Bytes(Vec<u8>),
    UintSeq(Vec<u64>),
}

impl HeaderValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            HeaderValue::Uint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HeaderValue::Bytes(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_uint_seq(&self) -> Option<&[u64]> {
        match self {
            HeaderValue::UintSeq(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Bool(value)
    }
}

impl From<u64> for HeaderValue {
    fn from(value: u64) -> Self {
        HeaderValue::Uint(value)
    }
}

impl From<u32> for HeaderValue {
    fn from(value: u32) -> Self {
        HeaderValue::Uint(u64::from(value))
    }
}

impl From<u16> for HeaderValue {
    fn from(value: u16) -> Self {
        HeaderValue::Uint(u64::from(value))
    }
}

impl From<u8> for HeaderValue {
    fn from(value: u8) -> Self {
        HeaderValue::Uint(u64::from(value))
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Str(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Str(value)
    }
}

impl From<Vec<u8>> for HeaderValue {
    fn from(value: Vec<u8>) -> Self {
        HeaderValue::Bytes(value)
    }
}

/// Generic key/value header set attached to every produced message.
///
/// Keys are unique; insertion order is not significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    entries: HashMap<String, HeaderValue>,
}

impl MessageHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HeaderValue)> {
        self.entries.iter()
    }
}

/// Bidirectional translation between protocol properties and headers.
///
/// `to_headers` must be pure and side-effect free. `from_headers` is the
/// inverse where one is defined; headers with no property counterpart are
/// carried as user properties.
pub trait HeaderMapper: Send + Sync {
    fn to_headers(&self, properties: &PublishProperties) -> MessageHeaders;

    fn from_headers(&self, headers: &MessageHeaders) -> PublishProperties;
}

/// Default mapper passing through the fixed known MQTT v5 property set.
///
/// User properties keep their own names in both directions; unknown
/// string-valued headers (outside the reserved `mqtt_` namespace) map back
/// to user properties, sorted by key for a deterministic wire order.
#[derive(Debug, Clone, Copy, Default)]
pub struct MqttHeaderMapper;

impl HeaderMapper for MqttHeaderMapper {
    fn to_headers(&self, properties: &PublishProperties) -> MessageHeaders {
        let mut headers = MessageHeaders::new();

        if let Some(indicator) = properties.payload_format_indicator {
            headers.insert(names::PAYLOAD_FORMAT_INDICATOR, indicator);
        }
        if let Some(interval) = properties.message_expiry_interval {
            headers.insert(names::MESSAGE_EXPIRY_INTERVAL, interval);
        }
        if let Some(alias) = properties.topic_alias {
            headers.insert(names::TOPIC_ALIAS, alias);
        }
        if let Some(response_topic) = &properties.response_topic {
            headers.insert(names::RESPONSE_TOPIC, response_topic.clone());
        }
        if let Some(correlation_data) = &properties.correlation_data {
            headers.insert(names::CORRELATION_DATA, correlation_data.to_vec());
        }
        if let Some(content_type) = &properties.content_type {
            headers.insert(names::CONTENT_TYPE, content_type.clone());
        }
        if !properties.subscription_identifiers.is_empty() {
            let identifiers: Vec<u64> = properties
                .subscription_identifiers
                .iter()
                .map(|id| *id as u64)
                .collect();
            headers.insert(
                names::SUBSCRIPTION_IDENTIFIERS,
                HeaderValue::UintSeq(identifiers),
            );
        }
        for (key, value) in &properties.user_properties {
            headers.insert(key.clone(), value.clone());
        }

        headers
    }

    fn from_headers(&self, headers: &MessageHeaders) -> PublishProperties {
        let mut properties = PublishProperties::default();

        for (name, value) in headers.iter() {
            match name.as_str() {
                names::PAYLOAD_FORMAT_INDICATOR => {
                    properties.payload_format_indicator =
                        value.as_uint().and_then(|v| u8::try_from(v).ok());
                }
                names::MESSAGE_EXPIRY_INTERVAL => {
                    properties.message_expiry_interval =
                        value.as_uint().and_then(|v| u32::try_from(v).ok());
                }
                names::TOPIC_ALIAS => {
                    properties.topic_alias = value.as_uint().and_then(|v| u16::try_from(v).ok());
                }
                names::RESPONSE_TOPIC => {
                    properties.response_topic = value.as_str().map(str::to_string);
                }
                names::CORRELATION_DATA => {
                    properties.correlation_data =
                        value.as_bytes().map(|bytes| Bytes::from(bytes.to_vec()));
                }
                names::CONTENT_TYPE => {
                    properties.content_type = value.as_str().map(str::to_string);
                }
                names::SUBSCRIPTION_IDENTIFIERS => {
                    if let Some(identifiers) = value.as_uint_seq() {
                        properties.subscription_identifiers =
                            identifiers.iter().map(|id| *id as usize).collect();
                    }
                }
                // Fixed per-message headers have no property counterpart
                other if other.starts_with("mqtt_") => {}
                other => {
                    if let Some(text) = value.as_str() {
                        properties
                            .user_properties
                            .push((other.to_string(), text.to_string()));
                    }
                }
            }
        }
        properties.user_properties.sort();

        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_properties() -> PublishProperties {
        PublishProperties {
            payload_format_indicator: Some(1),
            message_expiry_interval: Some(3600),
            topic_alias: Some(7),
            response_topic: Some("replies/thermostat".to_string()),
            correlation_data: Some(Bytes::from_static(b"corr-42")),
            user_properties: vec![
                ("device".to_string(), "thermostat-1".to_string()),
                ("firmware".to_string(), "2.4.1".to_string()),
            ],
            subscription_identifiers: vec![3, 11],
            content_type: Some("application/json".to_string()),
        }
    }

    #[test]
    fn test_to_headers_maps_known_properties() {
        let headers = MqttHeaderMapper.to_headers(&sample_properties());

        assert_eq!(
            headers
                .get(names::CONTENT_TYPE)
                .and_then(HeaderValue::as_str),
            Some("application/json")
        );
        assert_eq!(
            headers
                .get(names::MESSAGE_EXPIRY_INTERVAL)
                .and_then(HeaderValue::as_uint),
            Some(3600)
        );
        assert_eq!(
            headers
                .get(names::CORRELATION_DATA)
                .and_then(HeaderValue::as_bytes),
            Some(b"corr-42".as_slice())
        );
        assert_eq!(
            headers
                .get(names::SUBSCRIPTION_IDENTIFIERS)
                .and_then(HeaderValue::as_uint_seq),
            Some([3u64, 11].as_slice())
        );
    }

    #[test]
    fn test_to_headers_passes_user_properties_through() {
        let headers = MqttHeaderMapper.to_headers(&sample_properties());

        assert_eq!(
            headers.get("device").and_then(HeaderValue::as_str),
            Some("thermostat-1")
        );
        assert_eq!(
            headers.get("firmware").and_then(HeaderValue::as_str),
            Some("2.4.1")
        );
    }

    #[test]
    fn test_to_headers_skips_absent_properties() {
        let headers = MqttHeaderMapper.to_headers(&PublishProperties::default());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_round_trip_reproduces_properties() {
        let original = sample_properties();

        let headers = MqttHeaderMapper.to_headers(&original);
        let restored = MqttHeaderMapper.from_headers(&headers);

        assert_eq!(restored, original);
    }

    #[test]
    fn test_from_headers_ignores_fixed_message_headers() {
        let mut headers = MqttHeaderMapper.to_headers(&sample_properties());
        headers.insert(names::RECEIVED_TOPIC, "t1");
        headers.insert(names::RECEIVED_QOS, 1u8);
        headers.insert(names::ID, 5u16);

        let restored = MqttHeaderMapper.from_headers(&headers);

        // Fixed headers must not leak back as user properties
        assert_eq!(restored, sample_properties());
    }

    #[test]
    fn test_header_value_accessors() {
        assert_eq!(HeaderValue::Bool(true).as_bool(), Some(true));
        assert_eq!(HeaderValue::Uint(9).as_uint(), Some(9));
        assert_eq!(HeaderValue::Str("x".to_string()).as_str(), Some("x"));
        assert_eq!(HeaderValue::Uint(9).as_str(), None);
        assert_eq!(HeaderValue::Bool(false).as_uint(), None);
    }

    #[test]
    fn test_headers_insert_overwrites_duplicate_keys() {
        let mut headers = MessageHeaders::new();
        headers.insert("key", "first");
        headers.insert("key", "second");

        assert_eq!(headers.len(), 1);
        assert_eq!(
            headers.get("key").and_then(HeaderValue::as_str),
            Some("second")
        );
    }
}

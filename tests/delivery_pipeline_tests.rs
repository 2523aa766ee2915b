//! Delivery pipeline tests: header construction, the three payload modes,
//! manual acknowledgment correlation, and failure propagation back to the
//! client callback.

use bytes::Bytes;
use mqtt_channel_adapter::adapter::MqttInboundAdapter;
use mqtt_channel_adapter::client::ClientEventHandler;
use mqtt_channel_adapter::config::AdapterConfig;
use mqtt_channel_adapter::convert::PayloadMode;
use mqtt_channel_adapter::error::AdapterError;
use mqtt_channel_adapter::headers::{names, HeaderValue};
use mqtt_channel_adapter::message::InboundMqttMessage;
use mqtt_channel_adapter::testing::{
    CollectingChannel, FailingChannel, MockMqttClient, StubConverter,
};
use rumqttc::v5::mqttbytes::v5::PublishProperties;
use rumqttc::v5::mqttbytes::QoS;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn pipeline_config(payload_mode: PayloadMode) -> AdapterConfig {
    let mut config = AdapterConfig::new("mqtt://localhost:1883", "pipeline-adapter");
    config.payload_mode = payload_mode;
    config
}

struct Fixture {
    adapter: MqttInboundAdapter,
    client: Arc<MockMqttClient>,
    channel: Arc<CollectingChannel>,
}

fn fixture(config: AdapterConfig) -> Fixture {
    let client = Arc::new(MockMqttClient::new());
    let channel = Arc::new(CollectingChannel::new());
    let adapter = MqttInboundAdapter::builder(config, client.clone(), channel.clone()).build();
    Fixture {
        adapter,
        client,
        channel,
    }
}

fn envelope(topic: &str, payload: &'static [u8]) -> InboundMqttMessage {
    InboundMqttMessage {
        id: 7,
        qos: QoS::AtLeastOnce,
        dup: false,
        retain: false,
        topic: topic.to_string(),
        payload: Bytes::from_static(payload),
        properties: None,
    }
}

#[tokio::test]
async fn test_bytes_mode_delivers_raw_payload_with_fixed_headers() {
    let f = fixture(pipeline_config(PayloadMode::Bytes));

    f.adapter
        .on_message(envelope("sensors/kitchen", b"23.5"))
        .await
        .unwrap();

    let messages = f.channel.messages().await;
    assert_eq!(messages.len(), 1);
    let message = &messages[0];

    assert_eq!(message.payload.as_bytes().unwrap().as_ref(), b"23.5");

    let headers = &message.headers;
    assert_eq!(
        headers
            .get(names::RECEIVED_TOPIC)
            .and_then(HeaderValue::as_str),
        Some("sensors/kitchen")
    );
    assert_eq!(
        headers
            .get(names::RECEIVED_QOS)
            .and_then(HeaderValue::as_uint),
        Some(1)
    );
    assert_eq!(headers.get(names::ID).and_then(HeaderValue::as_uint), Some(7));
    assert_eq!(
        headers.get(names::DUPLICATE).and_then(HeaderValue::as_bool),
        Some(false)
    );
    assert_eq!(
        headers
            .get(names::RECEIVED_RETAINED)
            .and_then(HeaderValue::as_bool),
        Some(false)
    );
}

#[tokio::test]
async fn test_envelope_mode_delivers_whole_envelope() {
    let f = fixture(pipeline_config(PayloadMode::Envelope));
    let inbound = envelope("sensors/kitchen", b"23.5");

    f.adapter.on_message(inbound.clone()).await.unwrap();

    let messages = f.channel.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].payload.as_envelope(), Some(&inbound));
}

#[tokio::test]
async fn test_publish_properties_merge_into_headers() {
    let f = fixture(pipeline_config(PayloadMode::Bytes));
    let mut inbound = envelope("sensors/kitchen", b"{}");
    inbound.properties = Some(PublishProperties {
        content_type: Some("application/json".to_string()),
        response_topic: Some("replies/kitchen".to_string()),
        user_properties: vec![("device".to_string(), "thermostat-1".to_string())],
        ..Default::default()
    });

    f.adapter.on_message(inbound).await.unwrap();

    let messages = f.channel.messages().await;
    let headers = &messages[0].headers;
    assert_eq!(
        headers
            .get(names::CONTENT_TYPE)
            .and_then(HeaderValue::as_str),
        Some("application/json")
    );
    assert_eq!(
        headers
            .get(names::RESPONSE_TOPIC)
            .and_then(HeaderValue::as_str),
        Some("replies/kitchen")
    );
    assert_eq!(
        headers.get("device").and_then(HeaderValue::as_str),
        Some("thermostat-1")
    );
    // Fixed headers are still present alongside mapped properties
    assert!(headers.contains(names::RECEIVED_TOPIC));
}

#[tokio::test]
async fn test_convert_mode_uses_configured_converter() {
    let client = Arc::new(MockMqttClient::new());
    let channel = Arc::new(CollectingChannel::new());
    let adapter = MqttInboundAdapter::builder(
        pipeline_config(PayloadMode::Convert),
        client,
        channel.clone(),
    )
    .message_converter(Arc::new(StubConverter::returning(json!({
        "temperature": 23.5
    }))))
    .build();

    adapter
        .on_message(envelope("sensors/kitchen", b"ignored"))
        .await
        .unwrap();

    let messages = channel.messages().await;
    assert_eq!(
        messages[0].payload.as_converted(),
        Some(&json!({ "temperature": 23.5 }))
    );
}

#[tokio::test]
async fn test_convert_mode_default_converter_parses_json() {
    let f = fixture(pipeline_config(PayloadMode::Convert));

    f.adapter
        .on_message(envelope("sensors/kitchen", b"{\"temperature\": 23.5}"))
        .await
        .unwrap();

    let messages = f.channel.messages().await;
    assert_eq!(
        messages[0].payload.as_converted(),
        Some(&json!({ "temperature": 23.5 }))
    );
}

#[tokio::test]
async fn test_conversion_failure_propagates_and_delivers_nothing() {
    let client = Arc::new(MockMqttClient::new());
    let channel = Arc::new(CollectingChannel::new());
    let adapter = MqttInboundAdapter::builder(
        pipeline_config(PayloadMode::Convert),
        client,
        channel.clone(),
    )
    .message_converter(Arc::new(StubConverter::failing()))
    .build();

    let result = adapter.on_message(envelope("sensors/kitchen", b"junk")).await;

    assert!(matches!(result, Err(AdapterError::Conversion(_))));
    assert!(channel.messages().await.is_empty());
}

#[tokio::test]
async fn test_manual_acks_attach_acknowledgment() {
    let mut config = pipeline_config(PayloadMode::Bytes);
    config.manual_acks = true;
    let f = fixture(config);

    f.adapter
        .on_message(envelope("sensors/kitchen", b"23.5"))
        .await
        .unwrap();

    let messages = f.channel.messages().await;
    let acknowledgment = messages[0]
        .acknowledgment
        .as_ref()
        .expect("manual acks must attach an acknowledgment");
    assert_eq!(acknowledgment.id(), 7);
    assert_eq!(acknowledgment.qos(), QoS::AtLeastOnce);

    // Nothing completed until the consumer acknowledges
    assert!(f.client.completed_messages().await.is_empty());

    acknowledgment.acknowledge().await.unwrap();

    assert_eq!(
        f.client.completed_messages().await,
        vec![(7, QoS::AtLeastOnce)]
    );
}

#[tokio::test]
async fn test_acknowledgment_failure_propagates() {
    let mut config = pipeline_config(PayloadMode::Bytes);
    config.manual_acks = true;
    let f = fixture(config);
    f.client.fail_ack(true);

    f.adapter
        .on_message(envelope("sensors/kitchen", b"23.5"))
        .await
        .unwrap();

    let messages = f.channel.messages().await;
    let acknowledgment = messages[0].acknowledgment.as_ref().unwrap();

    let result = acknowledgment.acknowledge().await;
    match result {
        Err(AdapterError::Acknowledge { id, .. }) => assert_eq!(id, 7),
        other => panic!("expected Acknowledge error, got {other:?}"),
    }
    assert!(f.client.completed_messages().await.is_empty());
}

#[tokio::test]
async fn test_automatic_acks_attach_no_acknowledgment() {
    let f = fixture(pipeline_config(PayloadMode::Bytes));

    f.adapter
        .on_message(envelope("sensors/kitchen", b"23.5"))
        .await
        .unwrap();

    let messages = f.channel.messages().await;
    assert!(messages[0].acknowledgment.is_none());
}

#[tokio::test]
async fn test_downstream_failure_is_reraised_to_client() {
    let client = Arc::new(MockMqttClient::new());
    let adapter = MqttInboundAdapter::builder(
        pipeline_config(PayloadMode::Bytes),
        client,
        Arc::new(FailingChannel),
    )
    .build();

    let result = adapter.on_message(envelope("sensors/kitchen", b"23.5")).await;

    assert!(matches!(result, Err(AdapterError::Downstream(_))));
}

#[tokio::test]
async fn test_delivery_runs_concurrently_with_lifecycle() {
    let mut config = pipeline_config(PayloadMode::Bytes);
    config.completion_timeout_ms = 5_000;
    let client = Arc::new(MockMqttClient::new());
    let channel = Arc::new(CollectingChannel::new());
    let adapter = Arc::new(
        MqttInboundAdapter::builder(config, client.clone(), channel.clone()).build(),
    );
    client.set_operation_delay(Duration::from_millis(300));

    // Keep a slow start holding the topic lock
    let starter = adapter.clone();
    let start_handle = tokio::spawn(async move { starter.start().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Delivery must complete while start is still in flight
    tokio::time::timeout(
        Duration::from_millis(100),
        adapter.on_message(envelope("sensors/kitchen", b"23.5")),
    )
    .await
    .expect("delivery must not block on the topic lock")
    .unwrap();

    assert_eq!(channel.messages().await.len(), 1);
    start_handle.await.unwrap();
}

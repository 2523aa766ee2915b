//! Mock implementations for testing
//!
//! Provides a scriptable mock client, a recording event publisher, and
//! downstream channels to exercise the adapter without external
//! dependencies.

use crate::client::{ClientError, ConnectOptions, ManagedMqttClient};
use crate::config::TopicSpec;
use crate::convert::{ConversionError, MessageConverter};
use crate::error::AdapterError;
use crate::event::{AdapterEvent, EventPublisher};
use crate::headers::MessageHeaders;
use crate::message::{InboundMessage, MessageChannel};
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::v5::mqttbytes::QoS;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Mock broker client recording every call and mirroring the broker-side
/// subscription state.
///
/// Each operation can be scripted to fail; an optional per-operation delay
/// simulates a slow broker for timeout tests.
#[derive(Debug, Default)]
pub struct MockMqttClient {
    pub connect_calls: Arc<Mutex<Vec<ConnectOptions>>>,
    pub subscribe_calls: Arc<Mutex<Vec<Vec<TopicSpec>>>>,
    pub unsubscribe_calls: Arc<Mutex<Vec<Vec<String>>>>,
    pub disconnect_calls: Arc<Mutex<Vec<()>>>,
    pub close_calls: Arc<Mutex<Vec<bool>>>,
    pub completed_messages: Arc<Mutex<Vec<(u16, QoS)>>>,
    /// Topics the simulated broker currently considers subscribed
    pub broker_subscriptions: Arc<Mutex<Vec<String>>>,

    fail_connect: AtomicBool,
    fail_subscribe: AtomicBool,
    fail_unsubscribe: AtomicBool,
    fail_disconnect: AtomicBool,
    fail_close: AtomicBool,
    fail_ack: AtomicBool,
    operation_delay_ms: AtomicU64,
}

impl MockMqttClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_unsubscribe(&self, fail: bool) {
        self.fail_unsubscribe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn fail_ack(&self, fail: bool) {
        self.fail_ack.store(fail, Ordering::SeqCst);
    }

    /// Delay applied before every operation completes.
    pub fn set_operation_delay(&self, delay: Duration) {
        self.operation_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub async fn connect_calls(&self) -> Vec<ConnectOptions> {
        self.connect_calls.lock().await.clone()
    }

    pub async fn subscribe_calls(&self) -> Vec<Vec<TopicSpec>> {
        self.subscribe_calls.lock().await.clone()
    }

    pub async fn unsubscribe_calls(&self) -> Vec<Vec<String>> {
        self.unsubscribe_calls.lock().await.clone()
    }

    pub async fn disconnect_count(&self) -> usize {
        self.disconnect_calls.lock().await.len()
    }

    pub async fn close_calls(&self) -> Vec<bool> {
        self.close_calls.lock().await.clone()
    }

    pub async fn completed_messages(&self) -> Vec<(u16, QoS)> {
        self.completed_messages.lock().await.clone()
    }

    pub async fn broker_subscriptions(&self) -> Vec<String> {
        self.broker_subscriptions.lock().await.clone()
    }

    async fn simulate_latency(&self) {
        let delay_ms = self.operation_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

#[async_trait]
impl ManagedMqttClient for MockMqttClient {
    async fn connect(&self, options: &ConnectOptions) -> Result<(), ClientError> {
        self.simulate_latency().await;
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ClientError::new("mock connect failure"));
        }
        self.connect_calls.lock().await.push(options.clone());
        Ok(())
    }

    async fn subscribe(&self, subscriptions: &[TopicSpec]) -> Result<(), ClientError> {
        self.simulate_latency().await;
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(ClientError::with_reason_code(0x80, "mock subscribe failure"));
        }
        self.subscribe_calls
            .lock()
            .await
            .push(subscriptions.to_vec());

        let mut broker = self.broker_subscriptions.lock().await;
        for spec in subscriptions {
            if !broker.contains(&spec.topic) {
                broker.push(spec.topic.clone());
            }
        }
        Ok(())
    }

    async fn unsubscribe(&self, topics: &[String]) -> Result<(), ClientError> {
        self.simulate_latency().await;
        if self.fail_unsubscribe.load(Ordering::SeqCst) {
            return Err(ClientError::with_reason_code(
                0x80,
                "mock unsubscribe failure",
            ));
        }
        self.unsubscribe_calls.lock().await.push(topics.to_vec());

        let mut broker = self.broker_subscriptions.lock().await;
        broker.retain(|topic| !topics.contains(topic));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        self.simulate_latency().await;
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(ClientError::new("mock disconnect failure"));
        }
        self.disconnect_calls.lock().await.push(());
        Ok(())
    }

    async fn close(&self, force: bool) -> Result<(), ClientError> {
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(ClientError::new("mock close failure"));
        }
        self.close_calls.lock().await.push(force);
        Ok(())
    }

    async fn message_arrived_complete(&self, id: u16, qos: QoS) -> Result<(), ClientError> {
        if self.fail_ack.load(Ordering::SeqCst) {
            return Err(ClientError::new("mock acknowledgment failure"));
        }
        self.completed_messages.lock().await.push((id, qos));
        Ok(())
    }
}

/// Event publisher recording every published event.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: std::sync::Mutex<Vec<AdapterEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AdapterEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(&self, event: AdapterEvent) {
        self.events.lock().expect("events lock poisoned").push(event);
    }
}

/// Downstream channel collecting every delivered message.
#[derive(Debug, Default)]
pub struct CollectingChannel {
    messages: Mutex<Vec<InboundMessage>>,
}

impl CollectingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<InboundMessage> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl MessageChannel for CollectingChannel {
    async fn send(&self, message: InboundMessage) -> Result<(), AdapterError> {
        self.messages.lock().await.push(message);
        Ok(())
    }
}

/// Downstream channel that always rejects delivery.
#[derive(Debug, Default)]
pub struct FailingChannel;

#[async_trait]
impl MessageChannel for FailingChannel {
    async fn send(&self, _message: InboundMessage) -> Result<(), AdapterError> {
        Err(AdapterError::Downstream(
            "mock downstream failure".to_string(),
        ))
    }
}

/// Converter returning a fixed value, or failing on demand.
#[derive(Debug)]
pub struct StubConverter {
    value: serde_json::Value,
    fail: bool,
}

impl StubConverter {
    pub fn returning(value: serde_json::Value) -> Self {
        Self { value, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            value: serde_json::Value::Null,
            fail: true,
        }
    }
}

impl MessageConverter for StubConverter {
    fn to_payload(
        &self,
        _payload: &Bytes,
        _headers: &MessageHeaders,
    ) -> Result<serde_json::Value, ConversionError> {
        if self.fail {
            Err(ConversionError::Other("mock conversion failure".to_string()))
        } else {
            Ok(self.value.clone())
        }
    }
}

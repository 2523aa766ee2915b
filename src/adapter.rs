//! Message-driven inbound channel adapter for MQTT v5
//!
//! [`MqttInboundAdapter`] owns a single shared client handle and keeps
//! three things consistent under one topic lock: the connection lifecycle,
//! the subscribed topic set, and the broker-side subscription state.
//! Message delivery runs lock-free and concurrently with lifecycle
//! operations.
//!
//! Failure policy is deliberately asymmetric: managed lifecycle transitions
//! (`start`/`stop`) log and publish events without raising, while explicit
//! operator actions (`add_topic`/`remove_topics`) propagate errors to the
//! caller.

use crate::ack::MqttAcknowledgment;
use crate::client::{
    ClientError, ClientEventHandler, ConnectOptions, DisconnectReason, ManagedMqttClient,
};
use crate::config::{AdapterConfig, TopicSpec};
use crate::convert::{JsonMessageConverter, MessageConverter, PayloadMode};
use crate::error::{AdapterError, AdapterResult};
use crate::event::{AdapterEvent, EventPublisher};
use crate::headers::{names, HeaderMapper, MessageHeaders, MqttHeaderMapper};
use crate::message::{InboundMessage, InboundMqttMessage, MessageChannel, Payload};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, warn};

/// Nominal adapter lifecycle state.
///
/// An asynchronous disconnect notification while `Running` does not change
/// this state; the client may silently reconnect on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Inbound MQTT v5 channel adapter.
pub struct MqttInboundAdapter {
    config: AdapterConfig,
    client: Arc<dyn ManagedMqttClient>,
    channel: Arc<dyn MessageChannel>,
    header_mapper: Arc<dyn HeaderMapper>,
    converter: Arc<dyn MessageConverter>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
    /// Guards the topic set and every broker-state-changing client call.
    /// Maximum hold time is roughly the completion timeout times the number
    /// of broker operations in the guarded section.
    topics: Mutex<Vec<TopicSpec>>,
    state_tx: watch::Sender<AdapterState>,
}

impl MqttInboundAdapter {
    pub fn builder(
        config: AdapterConfig,
        client: Arc<dyn ManagedMqttClient>,
        channel: Arc<dyn MessageChannel>,
    ) -> MqttInboundAdapterBuilder {
        MqttInboundAdapterBuilder {
            config,
            client,
            channel,
            header_mapper: None,
            converter: None,
            event_publisher: None,
        }
    }

    /// Current nominal state.
    pub fn state(&self) -> AdapterState {
        *self.state_tx.borrow()
    }

    /// Watch channel for observing state transitions.
    pub fn state_watch(&self) -> watch::Receiver<AdapterState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the currently subscribed topic set.
    pub async fn subscribed_topics(&self) -> Vec<TopicSpec> {
        self.topics.lock().await.clone()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Connect and establish the initial subscriptions.
    ///
    /// Best-effort: any failure is logged and published as a
    /// [`AdapterEvent::ConnectionFailed`], never raised. Recovery is the
    /// client's automatic reconnect or an operator-triggered restart.
    pub async fn start(&self) {
        let topics = self.topics.lock().await;
        if self.state() == AdapterState::Running {
            debug!("adapter already running, ignoring start");
            return;
        }
        self.set_state(AdapterState::Starting);

        match self.connect_and_subscribe(&topics).await {
            Ok(()) => {
                self.set_state(AdapterState::Running);
                if !topics.is_empty() {
                    let names: Vec<String> = topics.iter().map(|t| t.topic.clone()).collect();
                    debug!(topics = ?names, "connected and subscribed");
                    self.publish_event(AdapterEvent::subscribed(names));
                }
            }
            Err(e) => {
                let names: Vec<String> = topics.iter().map(|t| t.topic.clone()).collect();
                error!(error = %e, topics = ?names, "error connecting or subscribing");
                self.publish_event(AdapterEvent::connection_failed(&e));
                self.set_state(AdapterState::Stopped);
            }
        }
    }

    async fn connect_and_subscribe(&self, topics: &[TopicSpec]) -> Result<(), ClientError> {
        let options = self.connect_options();
        self.await_completion("connect", self.client.connect(&options))
            .await?;
        if !topics.is_empty() {
            self.await_completion("subscribe", self.client.subscribe(topics))
                .await?;
        }
        Ok(())
    }

    /// Unsubscribe from the current topic set and disconnect.
    ///
    /// Failures are logged, never raised; the adapter ends up `Stopped`
    /// unconditionally.
    pub async fn stop(&self) {
        let topics = self.topics.lock().await;
        self.set_state(AdapterState::Stopping);

        let names: Vec<String> = topics.iter().map(|t| t.topic.clone()).collect();
        if let Err(e) = self.unsubscribe_and_disconnect(&names).await {
            error!(error = %e, topics = ?names, "error unsubscribing or disconnecting");
        }
        self.set_state(AdapterState::Stopped);
    }

    async fn unsubscribe_and_disconnect(&self, topics: &[String]) -> Result<(), ClientError> {
        self.await_completion("unsubscribe", self.client.unsubscribe(topics))
            .await?;
        self.await_completion("disconnect", self.client.disconnect())
            .await?;
        Ok(())
    }

    /// Irreversible teardown of the client handle. Expected to follow a
    /// stopped state; never blocks shutdown on failure.
    pub async fn destroy(&self) {
        if let Err(e) = self.client.close(true).await {
            error!(error = %e, "failed to close mqtt client");
        }
    }

    /// Subscribe to an additional topic and add it to the topic set.
    ///
    /// Unlike `start`, failure propagates: this is an explicit operator
    /// action expecting direct feedback. The set is only mutated after the
    /// broker acknowledged the subscription.
    pub async fn add_topic<S: Into<String>>(
        &self,
        topic: S,
        qos: rumqttc::v5::mqttbytes::QoS,
    ) -> AdapterResult<()> {
        let topic = topic.into();
        let mut topics = self.topics.lock().await;

        let spec = TopicSpec::new(topic.clone(), qos);
        self.await_completion("subscribe", self.client.subscribe(std::slice::from_ref(&spec)))
            .await
            .map_err(|source| AdapterError::Subscribe {
                topic: topic.clone(),
                source,
            })?;

        debug!(topic = %topic, qos = ?qos, "added topic subscription");
        topics.push(spec);
        Ok(())
    }

    /// Unsubscribe from the given topics and remove them from the set.
    /// Failure propagates and leaves the set unchanged.
    pub async fn remove_topics(&self, topics_to_remove: &[&str]) -> AdapterResult<()> {
        let mut topics = self.topics.lock().await;

        let names: Vec<String> = topics_to_remove.iter().map(|s| s.to_string()).collect();
        self.await_completion("unsubscribe", self.client.unsubscribe(&names))
            .await
            .map_err(|source| AdapterError::Unsubscribe {
                topics: names.clone(),
                source,
            })?;

        debug!(topics = ?names, "removed topic subscriptions");
        topics.retain(|spec| !topics_to_remove.contains(&spec.topic.as_str()));
        Ok(())
    }

    /// Bound a broker operation by the configured completion timeout.
    /// Elapse surfaces through the same path as a protocol failure.
    async fn await_completion<T, F>(
        &self,
        operation: &'static str,
        fut: F,
    ) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let timeout = self.config.completion_timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::new(format!(
                "{operation} did not complete within {}ms",
                timeout.as_millis()
            ))),
        }
    }

    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            server_uris: self.config.server_uris.clone(),
            client_id: self.config.client_id.clone(),
            automatic_reconnect: self.config.automatic_reconnect,
            manual_acks: self.config.manual_acks,
        }
    }

    fn set_state(&self, state: AdapterState) {
        self.state_tx.send_replace(state);
    }

    fn publish_event(&self, event: AdapterEvent) {
        if let Some(publisher) = &self.event_publisher {
            publisher.publish(event);
        }
    }

    fn build_headers(&self, message: &InboundMqttMessage) -> MessageHeaders {
        let mut headers = match &message.properties {
            Some(properties) => self.header_mapper.to_headers(properties),
            None => MessageHeaders::new(),
        };
        headers.insert(names::ID, message.id);
        headers.insert(names::RECEIVED_QOS, message.qos as u8);
        headers.insert(names::DUPLICATE, message.dup);
        headers.insert(names::RECEIVED_RETAINED, message.retain);
        headers.insert(names::RECEIVED_TOPIC, message.topic.clone());
        headers
    }
}

/// The adapter is the callback target of its own client.
#[async_trait]
impl ClientEventHandler for MqttInboundAdapter {
    /// The inbound delivery pipeline. Runs without the topic lock and may
    /// execute concurrently with lifecycle or topic operations; the topic
    /// set may be briefly stale relative to in-flight messages.
    async fn on_message(&self, message: InboundMqttMessage) -> AdapterResult<()> {
        let headers = self.build_headers(&message);

        let acknowledgment = self.config.manual_acks.then(|| {
            Arc::new(MqttAcknowledgment::new(
                message.id,
                message.qos,
                self.client.clone(),
            ))
        });

        let payload = match self.config.payload_mode {
            PayloadMode::Envelope => Payload::Envelope(message.clone()),
            PayloadMode::Bytes => Payload::Bytes(message.payload.clone()),
            PayloadMode::Convert => {
                Payload::Converted(self.converter.to_payload(&message.payload, &headers)?)
            }
        };

        let outbound = InboundMessage {
            payload,
            headers,
            acknowledgment,
        };

        if let Err(e) = self.channel.send(outbound).await {
            // Re-raise so the client knows delivery did not succeed
            error!(
                topic = %message.topic,
                id = message.id,
                qos = ?message.qos,
                error = %e,
                "unhandled failure delivering inbound message"
            );
            return Err(e);
        }
        Ok(())
    }

    /// Never takes the topic lock and never changes the nominal state:
    /// the client may be reconnecting on its own.
    async fn on_disconnect(&self, reason: DisconnectReason) {
        debug!(reason_code = ?reason.reason_code, "client reported disconnect");
        if let Some(cause) = reason.cause {
            self.publish_event(AdapterEvent::connection_failed(&cause));
        }
    }

    async fn on_error(&self, error: ClientError) {
        warn!(error = %error, "client reported protocol error");
        self.publish_event(AdapterEvent::protocol_error(&error));
    }
}

/// Builder wiring the adapter's collaborators.
pub struct MqttInboundAdapterBuilder {
    config: AdapterConfig,
    client: Arc<dyn ManagedMqttClient>,
    channel: Arc<dyn MessageChannel>,
    header_mapper: Option<Arc<dyn HeaderMapper>>,
    converter: Option<Arc<dyn MessageConverter>>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl MqttInboundAdapterBuilder {
    pub fn header_mapper(mut self, mapper: Arc<dyn HeaderMapper>) -> Self {
        self.header_mapper = Some(mapper);
        self
    }

    pub fn message_converter(mut self, converter: Arc<dyn MessageConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    pub fn build(self) -> MqttInboundAdapter {
        if !self.config.automatic_reconnect {
            warn!(
                "automatic reconnect is disabled; only an explicit restart of this adapter \
                 recovers the connection, e.g. by handling connection-failed events"
            );
        }

        let (state_tx, _) = watch::channel(AdapterState::Stopped);
        MqttInboundAdapter {
            topics: Mutex::new(self.config.topics.clone()),
            config: self.config,
            client: self.client,
            channel: self.channel,
            header_mapper: self
                .header_mapper
                .unwrap_or_else(|| Arc::new(MqttHeaderMapper)),
            converter: self
                .converter
                .unwrap_or_else(|| Arc::new(JsonMessageConverter)),
            event_publisher: self.event_publisher,
            state_tx,
        }
    }
}

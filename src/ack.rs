//! Manual acknowledgment correlation
//!
//! When the adapter runs with manual acknowledgments, every produced
//! message carries an [`MqttAcknowledgment`] bound to the arrived message's
//! identifier and QoS. The downstream consumer owns the handle and invokes
//! completion exactly once; a repeat invocation is not rejected here, it
//! simply reaches the client again.

use crate::client::ManagedMqttClient;
use crate::error::{AdapterError, AdapterResult};
use rumqttc::v5::mqttbytes::QoS;
use std::fmt;
use std::sync::Arc;

/// Handle completing the arrival of one received message.
#[derive(Clone)]
pub struct MqttAcknowledgment {
    id: u16,
    qos: QoS,
    client: Arc<dyn ManagedMqttClient>,
}

impl MqttAcknowledgment {
    pub(crate) fn new(id: u16, qos: QoS, client: Arc<dyn ManagedMqttClient>) -> Self {
        Self { id, qos, client }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn qos(&self) -> QoS {
        self.qos
    }

    /// Tell the client that processing of this message is complete.
    /// Failure propagates; there is no retry.
    pub async fn acknowledge(&self) -> AdapterResult<()> {
        self.client
            .message_arrived_complete(self.id, self.qos)
            .await
            .map_err(|source| AdapterError::Acknowledge {
                id: self.id,
                source,
            })
    }
}

impl fmt::Debug for MqttAcknowledgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttAcknowledgment")
            .field("id", &self.id)
            .field("qos", &self.qos)
            .finish()
    }
}

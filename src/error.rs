//! Adapter error taxonomy
//!
//! Only operator-invoked operations and the delivery pipeline surface these
//! errors; managed lifecycle transitions log and publish events instead.

use crate::client::ClientError;
use crate::convert::ConversionError;
use thiserror::Error;

/// Errors raised by explicit adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to subscribe to topic '{topic}'")]
    Subscribe {
        topic: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to unsubscribe from topic(s) {topics:?}")]
    Unsubscribe {
        topics: Vec<String>,
        #[source]
        source: ClientError,
    },

    #[error("failed to acknowledge message {id}")]
    Acknowledge {
        id: u16,
        #[source]
        source: ClientError,
    },

    #[error("payload conversion failed")]
    Conversion(#[from] ConversionError),

    #[error("downstream delivery failed: {0}")]
    Downstream(String),
}

/// Result alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

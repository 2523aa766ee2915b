//! Lifecycle events emitted by the adapter
//!
//! Events are fire-and-forget observations: emitted to the optional
//! [`EventPublisher`], never retained by the adapter.

use chrono::{DateTime, Utc};
use std::fmt;

/// Observable lifecycle event.
#[derive(Debug, Clone)]
pub enum AdapterEvent {
    /// Start completed: connected and subscribed to the listed topics.
    Subscribed {
        topics: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// Connect or subscribe failed during start, or the client reported a
    /// disconnect with a cause.
    ConnectionFailed {
        cause: String,
        timestamp: DateTime<Utc>,
    },
    /// The client reported a protocol-level error.
    ProtocolError {
        cause: String,
        timestamp: DateTime<Utc>,
    },
}

impl AdapterEvent {
    pub fn subscribed(topics: Vec<String>) -> Self {
        AdapterEvent::Subscribed {
            topics,
            timestamp: Utc::now(),
        }
    }

    pub fn connection_failed(cause: &dyn fmt::Display) -> Self {
        AdapterEvent::ConnectionFailed {
            cause: cause.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn protocol_error(cause: &dyn fmt::Display) -> Self {
        AdapterEvent::ProtocolError {
            cause: cause.to_string(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for AdapterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterEvent::Subscribed { topics, .. } => {
                write!(f, "connected and subscribed to {topics:?}")
            }
            AdapterEvent::ConnectionFailed { cause, .. } => {
                write!(f, "connection failed: {cause}")
            }
            AdapterEvent::ProtocolError { cause, .. } => {
                write!(f, "protocol error: {cause}")
            }
        }
    }
}

/// Optional event sink; all publishing is a no-op when absent.
///
/// `publish` is fire-and-forget; no return value is consulted.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: AdapterEvent);
}

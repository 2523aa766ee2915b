//! Test support utilities
//!
//! Mock implementations of the adapter's collaborator traits, used by the
//! crate's own test suites and available to downstream crates for testing
//! adapter wiring without a broker.

pub mod mocks;

pub use mocks::{
    CollectingChannel, FailingChannel, MockMqttClient, RecordingEventPublisher, StubConverter,
};

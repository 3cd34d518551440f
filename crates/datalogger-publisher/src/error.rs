//! Error types for the publisher binary.

/// Errors raised while delivering telemetry.
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    /// The MQTT client rejected the request (its request channel is closed).
    #[error("MQTT error: {0}")]
    Mqtt(String),

    /// The payload could not be serialized.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

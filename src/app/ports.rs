//! Port traits: the hexagonal boundary between the controller and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ TelemetryController (domain)
//! ```
//!
//! Driven adapters (sensor, broker, clock, event sink, storage) implement
//! these traits.  The [`TelemetryController`](super::controller::TelemetryController)
//! consumes them via generics, so the domain core never touches the
//! network stack or the I2C peripheral directly.

use crate::config::{BrokerEndpoint, NodeConfig};
use crate::error::{CommsError, SensorError};

use super::events::{AppEvent, SessionId};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one ambient temperature sample per call.
pub trait SensorProbe {
    /// Sample the ambient temperature in degrees Celsius.
    fn sample(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Broker ports (driven adapter: domain ↔ MQTT client)
// ───────────────────────────────────────────────────────────────

/// Delivery guarantee requested for a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryGuarantee {
    /// QoS 0, fire and forget.
    AtMostOnce,
    /// QoS 1, acknowledged, may duplicate.
    AtLeastOnce,
}

/// A single open broker session.
///
/// Dropping the session tears down the underlying client.
pub trait BrokerSession {
    /// Subscribe to `topic`.  Returns the broker message id.
    fn subscribe(&mut self, topic: &str, guarantee: DeliveryGuarantee) -> Result<u32, CommsError>;

    /// Publish `payload` to `topic`.  Returns the broker message id.
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        guarantee: DeliveryGuarantee,
        retain: bool,
    ) -> Result<u32, CommsError>;
}

/// Factory for broker sessions.
///
/// The returned session reports its lifecycle asynchronously: the adapter
/// posts [`SessionEvent`](super::events::SessionEvent)s tagged with `id`
/// onto the controller's event bus.  Reconnect and backoff of the
/// transport itself are the adapter's business.
pub trait BrokerConnector {
    type Session: BrokerSession;

    fn open(&mut self, id: SessionId, endpoint: &BrokerEndpoint)
        -> Result<Self::Session, CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (tick source)
// ───────────────────────────────────────────────────────────────

/// Monotonic time plus a cooperative sleep.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin (monotonic).
    fn now_ms(&self) -> u64;

    /// Block the calling task for `ms` milliseconds without spinning.
    fn sleep_ms(&self, ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`AppEvent`]s through this port.
/// Adapters decide where they go (serial log, test recorder, ...).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// Implementations MUST validate before persisting; invalid values are
/// rejected with [`ConfigError::ValidationFailed`], never clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`NodeConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from bringing up or using persistent storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The partition has no free pages or was written by a newer layout.
    NeedsErase,
    /// Erasing the partition failed.
    EraseFailed,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NeedsErase => write!(f, "partition needs erase"),
            Self::EraseFailed => write!(f, "partition erase failed"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

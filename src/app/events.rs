//! Controller events, both directions.
//!
//! Inbound: adapters post [`ControllerEvent`]s onto the
//! [`EventBus`](super::bus::EventBus) from their callback contexts; the
//! controller task drains them.
//!
//! Outbound: the [`TelemetryController`](super::controller::TelemetryController)
//! emits [`AppEvent`]s through the [`EventSink`](super::ports::EventSink)
//! port for logging and inspection.

use crate::error::{CommsError, SensorError};

/// Maximum stored topic length for an inbound message.
pub const INBOUND_TOPIC_CAP: usize = 64;

/// Maximum stored payload length for an inbound message.
pub const INBOUND_PAYLOAD_CAP: usize = 256;

/// Fixed-capacity payload string for one telemetry publish.
pub type Payload = heapless::String<48>;

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// Status transitions reported by the WiFi station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Connecting,
    Connected,
    Disconnected,
    AddressAcquired,
}

/// Generation number of a broker session.  Every open attempt gets a
/// fresh id so late events from a discarded session can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u32);

/// A message delivered on a subscribed topic.
///
/// Topic and payload are length-delimited copies of the broker buffers,
/// truncated to the fixed capacities above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: heapless::String<INBOUND_TOPIC_CAP>,
    pub payload: heapless::Vec<u8, INBOUND_PAYLOAD_CAP>,
    /// `true` if either topic or payload had to be cut.
    pub truncated: bool,
}

impl InboundMessage {
    pub fn new(topic: &str, payload: &[u8]) -> Self {
        let mut truncated = false;

        let mut t = heapless::String::new();
        for ch in topic.chars() {
            if t.push(ch).is_err() {
                truncated = true;
                break;
            }
        }

        let take = payload.len().min(INBOUND_PAYLOAD_CAP);
        truncated |= take < payload.len();
        let mut p = heapless::Vec::new();
        // Cannot fail: `take` is bounded by the capacity.
        let _ = p.extend_from_slice(&payload[..take]);

        Self {
            topic: t,
            payload: p,
            truncated,
        }
    }
}

/// Lifecycle events reported by a broker session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    Opened,
    Closed,
    Subscribed { msg_id: u32 },
    Delivered { msg_id: u32 },
    MessageReceived(InboundMessage),
}

/// A session event tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub kind: SessionEventKind,
}

/// Everything the controller task consumes from the event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    Connectivity(ConnectivityEvent),
    Session(SessionEvent),
}

impl From<ConnectivityEvent> for ControllerEvent {
    fn from(ev: ConnectivityEvent) -> Self {
        Self::Connectivity(ev)
    }
}

impl From<SessionEvent> for ControllerEvent {
    fn from(ev: SessionEvent) -> Self {
        Self::Session(ev)
    }
}

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A WiFi status event was observed.
    Network(ConnectivityEvent),

    /// The startup gate opened with an address after `waited_ms`.
    NetworkReady { waited_ms: u64 },

    /// The startup gate gave up waiting for an address.
    NetworkTimeout { waited_ms: u64 },

    /// A broker session open was requested.
    SessionOpening(SessionId),

    /// The broker session open request failed.
    SessionOpenFailed(CommsError),

    /// The session became live.
    SessionOpened(SessionId),

    /// The live session closed; the handle is kept for the client's reconnect.
    SessionClosed(SessionId),

    /// The session handle was discarded after the network went away.
    SessionDropped(SessionId),

    /// The control topic subscription request was issued.
    SubscribeRequested { msg_id: u32 },

    /// The control topic subscription request failed.
    SubscribeFailed(CommsError),

    /// The broker acknowledged a subscription.
    Subscribed { msg_id: u32 },

    /// The broker acknowledged a publish.
    Delivered { msg_id: u32 },

    /// A message arrived on a subscribed topic.
    MessageReceived(InboundMessage),

    /// A telemetry payload was handed to the broker client.
    Published { msg_id: u32, payload: Payload },

    /// The broker client refused a telemetry publish.
    PublishFailed(CommsError),

    /// The sensor could not be read this tick.
    SensorFault(SensorError),

    /// No live session; nothing was sampled or published this tick.
    TickSkipped,
}

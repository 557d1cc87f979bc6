//! MQTT broker adapter.
//!
//! Implements [`BrokerConnector`] / [`BrokerSession`].  Each opened
//! session owns one client; its lifecycle callbacks are translated into
//! [`SessionEvent`]s tagged with the session's [`SessionId`] and posted to
//! the controller's [`EventBus`].  The client runs its own transport
//! reconnect; dropping the session destroys the client.
//!
//! - **`feature = "espidf"`**: `EspMqttClient` (ESP-IDF `esp-mqtt`).
//! - **host**: a loopback simulation that acknowledges everything.

use log::info;

use crate::app::bus::EventBus;
use crate::app::events::{SessionEvent, SessionEventKind, SessionId};
use crate::app::ports::{BrokerConnector, BrokerSession, DeliveryGuarantee};
use crate::config::BrokerEndpoint;
use crate::error::CommsError;

#[cfg(feature = "espidf")]
use log::{debug, warn};

#[cfg(feature = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttEvent, EventPayload, MqttClientConfiguration, QoS,
};

#[cfg(feature = "espidf")]
use crate::app::events::InboundMessage;

fn post(bus: &EventBus, session: SessionId, kind: SessionEventKind) {
    bus.post(SessionEvent { session, kind });
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(feature = "espidf")]
fn qos(guarantee: DeliveryGuarantee) -> QoS {
    match guarantee {
        DeliveryGuarantee::AtMostOnce => QoS::AtMostOnce,
        DeliveryGuarantee::AtLeastOnce => QoS::AtLeastOnce,
    }
}

#[cfg(feature = "espidf")]
fn forward(bus: &EventBus, id: SessionId, event: &EspMqttEvent<'_>) {
    match event.payload() {
        EventPayload::Connected(_) => post(bus, id, SessionEventKind::Opened),
        EventPayload::Disconnected => post(bus, id, SessionEventKind::Closed),
        EventPayload::Subscribed(msg_id) => {
            post(bus, id, SessionEventKind::Subscribed { msg_id });
        }
        EventPayload::Published(msg_id) => {
            post(bus, id, SessionEventKind::Delivered { msg_id });
        }
        EventPayload::Received {
            topic, data, details, ..
        } => {
            // Only the first chunk of a fragmented message carries the topic.
            if matches!(details, Details::SubsequentChunk(_)) {
                return;
            }
            let message = InboundMessage::new(topic.unwrap_or(""), data);
            post(bus, id, SessionEventKind::MessageReceived(message));
        }
        EventPayload::Error(e) => warn!("MQTT[{}]: client error {:?}", id.0, e),
        other => debug!("MQTT[{}]: {:?}", id.0, other),
    }
}

#[cfg(feature = "espidf")]
pub struct EspMqttConnector {
    bus: &'static EventBus,
    client_id: String,
}

#[cfg(feature = "espidf")]
impl EspMqttConnector {
    pub fn new(bus: &'static EventBus, client_id: &str) -> Self {
        Self {
            bus,
            client_id: client_id.to_string(),
        }
    }
}

#[cfg(feature = "espidf")]
pub struct EspMqttSession {
    id: SessionId,
    client: EspMqttClient<'static>,
}

#[cfg(feature = "espidf")]
impl BrokerConnector for EspMqttConnector {
    type Session = EspMqttSession;

    fn open(&mut self, id: SessionId, endpoint: &BrokerEndpoint) -> Result<EspMqttSession, CommsError> {
        let url = endpoint.url();
        let conf = MqttClientConfiguration {
            client_id: (!self.client_id.is_empty()).then_some(self.client_id.as_str()),
            ..Default::default()
        };
        let bus = self.bus;
        let client = EspMqttClient::new_cb(&url, &conf, move |event| forward(bus, id, &event))
            .map_err(|e| {
                warn!("MQTT[{}]: client init for {} failed: {}", id.0, url, e);
                CommsError::SessionOpenFailed
            })?;
        info!("MQTT[{}]: client started for {}", id.0, url);
        Ok(EspMqttSession { id, client })
    }
}

#[cfg(feature = "espidf")]
impl BrokerSession for EspMqttSession {
    fn subscribe(&mut self, topic: &str, guarantee: DeliveryGuarantee) -> Result<u32, CommsError> {
        self.client.subscribe(topic, qos(guarantee)).map_err(|e| {
            warn!("MQTT[{}]: subscribe '{}' failed: {}", self.id.0, topic, e);
            CommsError::SubscribeFailed
        })
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        guarantee: DeliveryGuarantee,
        retain: bool,
    ) -> Result<u32, CommsError> {
        self.client
            .publish(topic, qos(guarantee), retain, payload)
            .map_err(|e| {
                warn!("MQTT[{}]: publish '{}' failed: {}", self.id.0, topic, e);
                CommsError::PublishFailed
            })
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

/// Loopback broker: every open succeeds and immediately reports the
/// session connected; every subscribe and publish is acknowledged.
#[cfg(not(feature = "espidf"))]
pub struct SimBrokerConnector {
    bus: &'static EventBus,
    opens: u32,
}

#[cfg(not(feature = "espidf"))]
impl SimBrokerConnector {
    pub fn new(bus: &'static EventBus) -> Self {
        Self { bus, opens: 0 }
    }

    pub fn opens(&self) -> u32 {
        self.opens
    }
}

#[cfg(not(feature = "espidf"))]
pub struct SimBrokerSession {
    bus: &'static EventBus,
    id: SessionId,
    next_msg_id: u32,
    pub published: Vec<(String, Vec<u8>)>,
}

#[cfg(not(feature = "espidf"))]
impl SimBrokerSession {
    fn next_msg_id(&mut self) -> u32 {
        self.next_msg_id += 1;
        self.next_msg_id
    }

    /// Simulate the broker dropping the connection.
    pub fn sim_close(&self) {
        post(self.bus, self.id, SessionEventKind::Closed);
    }
}

#[cfg(not(feature = "espidf"))]
impl BrokerConnector for SimBrokerConnector {
    type Session = SimBrokerSession;

    fn open(&mut self, id: SessionId, endpoint: &BrokerEndpoint) -> Result<SimBrokerSession, CommsError> {
        self.opens += 1;
        info!("MQTT(sim)[{}]: connecting to {}", id.0, endpoint.url());
        post(self.bus, id, SessionEventKind::Opened);
        Ok(SimBrokerSession {
            bus: self.bus,
            id,
            next_msg_id: 0,
            published: Vec::new(),
        })
    }
}

#[cfg(not(feature = "espidf"))]
impl BrokerSession for SimBrokerSession {
    fn subscribe(&mut self, topic: &str, _guarantee: DeliveryGuarantee) -> Result<u32, CommsError> {
        let msg_id = self.next_msg_id();
        info!("MQTT(sim)[{}]: subscribe '{}'", self.id.0, topic);
        post(self.bus, self.id, SessionEventKind::Subscribed { msg_id });
        Ok(msg_id)
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        guarantee: DeliveryGuarantee,
        _retain: bool,
    ) -> Result<u32, CommsError> {
        let msg_id = self.next_msg_id();
        self.published.push((topic.to_string(), payload.to_vec()));
        if guarantee == DeliveryGuarantee::AtLeastOnce {
            post(self.bus, self.id, SessionEventKind::Delivered { msg_id });
        }
        Ok(msg_id)
    }
}

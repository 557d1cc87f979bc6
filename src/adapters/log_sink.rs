//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`AppEvent`] as one tagged
//! line to the logger (UART / USB-CDC in production):
//!
//! | Tag      | Events                                   |
//! |----------|------------------------------------------|
//! | `NET`    | WiFi status, startup gate                |
//! | `MQTT`   | session lifecycle, subscribe, delivery   |
//! | `TELEM`  | publishes, sensor faults, skipped ticks  |
//! | `RX`     | inbound messages                         |

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Network(ev) => info!("NET | {:?}", ev),
            AppEvent::NetworkReady { waited_ms } => {
                info!("NET | ready after {} ms", waited_ms);
            }
            AppEvent::NetworkTimeout { waited_ms } => {
                warn!("NET | no address after {} ms, continuing", waited_ms);
            }
            AppEvent::SessionOpening(id) => info!("MQTT | opening session {}", id.0),
            AppEvent::SessionOpenFailed(e) => warn!("MQTT | open failed: {}", e),
            AppEvent::SessionOpened(id) => info!("MQTT | session {} connected", id.0),
            AppEvent::SessionClosed(id) => warn!("MQTT | session {} disconnected", id.0),
            AppEvent::SessionDropped(id) => warn!("MQTT | session {} discarded", id.0),
            AppEvent::SubscribeRequested { msg_id } => {
                info!("MQTT | subscribe sent, msg_id={}", msg_id);
            }
            AppEvent::SubscribeFailed(e) => warn!("MQTT | subscribe failed: {}", e),
            AppEvent::Subscribed { msg_id } => info!("MQTT | subscribed, msg_id={}", msg_id),
            AppEvent::Delivered { msg_id } => info!("MQTT | published, msg_id={}", msg_id),
            AppEvent::MessageReceived(msg) => {
                info!(
                    "RX | topic={} | data={}{}",
                    msg.topic,
                    String::from_utf8_lossy(&msg.payload),
                    if msg.truncated { " (truncated)" } else { "" },
                );
            }
            AppEvent::Published { msg_id, payload } => {
                info!("TELEM | '{}' queued, msg_id={}", payload, msg_id);
            }
            AppEvent::PublishFailed(e) => warn!("TELEM | publish failed: {}", e),
            AppEvent::SensorFault(e) => warn!("TELEM | sensor fault: {}", e),
            AppEvent::TickSkipped => info!("TELEM | no session, tick skipped"),
        }
    }
}

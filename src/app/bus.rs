//! Controller event bus.
//!
//! Uses an `embassy-sync` bounded MPMC channel to bridge the WiFi and
//! MQTT callback contexts with the controller task.  Producers never
//! block: when the channel is full the event is dropped and logged.
//!
//! ```text
//! ┌──────────────┐
//! │ WiFi sysloop │──┐   ControllerEvent   ┌──────────────┐
//! └──────────────┘  ├───────────────────▶│  Controller   │
//! ┌──────────────┐  │                     │  task         │
//! │ MQTT client  │──┘                     └──────────────┘
//! └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use super::events::ControllerEvent;

/// Channel depth for pending controller events.
pub const EVENT_BUS_DEPTH: usize = 32;

pub struct EventBus {
    channel: Channel<CriticalSectionRawMutex, ControllerEvent, EVENT_BUS_DEPTH>,
}

impl EventBus {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Post an event from any context.  Returns `false` if it was dropped.
    pub fn post(&self, event: impl Into<ControllerEvent>) -> bool {
        match self.channel.try_send(event.into()) {
            Ok(()) => true,
            Err(embassy_sync::channel::TrySendError::Full(ev)) => {
                warn!("EventBus: full, dropping {:?}", ev);
                false
            }
        }
    }

    /// Take the oldest pending event, if any.
    pub fn try_next(&self) -> Option<ControllerEvent> {
        self.channel.try_receive().ok()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

//! Telemetry controller, the hexagonal core.
//!
//! [`TelemetryController`] owns the connectivity state, the single broker
//! session handle and the tick clock.  It drains adapter events from the
//! [`EventBus`], gates startup on network readiness, opens and subscribes
//! the broker session, and runs the sampling-publish loop.  All I/O flows
//! through port traits, so the whole lifecycle is testable with mocks.
//!
//! ```text
//!  EventBus ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!               │   TelemetryController    │
//! SensorProbe ─▶│  gate · session · ticks  │──▶ BrokerSession
//!               └──────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::{BrokerEndpoint, NodeConfig};
use crate::error::CommsError;

use super::bus::EventBus;
use super::events::{
    AppEvent, ConnectivityEvent, ControllerEvent, SessionEvent, SessionEventKind, SessionId,
};
use super::link::{ConnectivityState, SessionLink, SlotOccupied};
use super::ports::{BrokerConnector, BrokerSession, Clock, DeliveryGuarantee, EventSink, SensorProbe};
use super::telemetry::{Reading, plan_publish};
use super::tick::TickClock;

/// Upper bound on a single sleep while waiting, so events are drained promptly.
const EVENT_POLL_MS: u64 = 50;

// ───────────────────────────────────────────────────────────────
// Settings, outcomes, stats
// ───────────────────────────────────────────────────────────────

/// The slice of [`NodeConfig`] the controller needs.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub endpoint: BrokerEndpoint,
    pub telemetry_topic: String,
    pub control_topic: String,
    pub tick_period_ms: u32,
    pub settle_delay_ms: u32,
    pub network_ready_timeout_ms: u32,
    pub session_wait_log_ms: u32,
}

impl From<&NodeConfig> for ControllerSettings {
    fn from(config: &NodeConfig) -> Self {
        Self {
            endpoint: config.endpoint(),
            telemetry_topic: config.telemetry_topic.clone(),
            control_topic: config.control_topic.clone(),
            tick_period_ms: config.tick_period_ms,
            settle_delay_ms: config.settle_delay_ms,
            network_ready_timeout_ms: config.network_ready_timeout_ms,
            session_wait_log_ms: config.session_wait_log_ms,
        }
    }
}

/// How the startup gate opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// An address was acquired and the settle delay elapsed.
    Ready { waited_ms: u64 },
    /// No address within the timeout; the session opens once one arrives.
    TimedOut { waited_ms: u64 },
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No live session: nothing sampled, nothing published.
    Skipped,
    /// The payload for `reading` was handed to the broker client.
    Published { reading: Reading, msg_id: u32 },
    /// The broker client refused the publish; the tick is lost.
    PublishFailed { reading: Reading, error: CommsError },
}

/// Running counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub ticks: u64,
    pub published: u64,
    pub skipped: u64,
    pub sensor_failures: u64,
    pub publish_errors: u64,
    pub sessions_opened: u64,
}

// ───────────────────────────────────────────────────────────────
// TelemetryController
// ───────────────────────────────────────────────────────────────

pub struct TelemetryController<'a, C: BrokerConnector> {
    settings: ControllerSettings,
    bus: &'a EventBus,
    connector: C,
    link: SessionLink<C::Session>,
    ticker: TickClock,
    next_session: u32,
    /// Session opens are held back until the startup gate has passed.
    sessions_enabled: bool,
    stats: TelemetryStats,
}

impl<'a, C: BrokerConnector> TelemetryController<'a, C> {
    pub fn new(settings: ControllerSettings, bus: &'a EventBus, connector: C) -> Self {
        let ticker = TickClock::new(settings.tick_period_ms);
        Self {
            settings,
            bus,
            connector,
            link: SessionLink::new(),
            ticker,
            next_session: 1,
            sessions_enabled: false,
            stats: TelemetryStats::default(),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ConnectivityState {
        self.link.state()
    }

    pub fn link(&self) -> &SessionLink<C::Session> {
        &self.link
    }

    pub fn stats(&self) -> TelemetryStats {
        self.stats
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    // ── Event routing ─────────────────────────────────────────

    /// Drain every pending bus event.  Returns how many were handled.
    pub fn pump_events(&mut self, sink: &mut impl EventSink) -> usize {
        let mut handled = 0;
        while let Some(event) = self.bus.try_next() {
            self.handle_event(event, sink);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: ControllerEvent, sink: &mut impl EventSink) {
        match event {
            ControllerEvent::Connectivity(ev) => self.on_connectivity(ev, sink),
            ControllerEvent::Session(ev) => self.on_session(ev, sink),
        }
    }

    fn on_connectivity(&mut self, event: ConnectivityEvent, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Network(event));
        match event {
            ConnectivityEvent::Connecting | ConnectivityEvent::Connected => {}
            ConnectivityEvent::AddressAcquired => {
                let needs_session = self.link.network_up();
                if needs_session && self.sessions_enabled {
                    self.open_session(sink);
                }
            }
            ConnectivityEvent::Disconnected => {
                if let Some((id, session)) = self.link.network_down() {
                    // Dropping the handle tears the client down.
                    drop(session);
                    info!("Controller: network lost, session {:?} discarded", id);
                    sink.emit(&AppEvent::SessionDropped(id));
                }
            }
        }
    }

    fn on_session(&mut self, event: SessionEvent, sink: &mut impl EventSink) {
        let SessionEvent { session, kind } = event;
        match kind {
            SessionEventKind::Opened => {
                if self.link.session_opened(session) {
                    sink.emit(&AppEvent::SessionOpened(session));
                    self.subscribe_control(sink);
                } else {
                    debug!("Controller: ignoring SessionOpened for {:?}", session);
                }
            }
            SessionEventKind::Closed => {
                if self.link.session_closed(session) {
                    sink.emit(&AppEvent::SessionClosed(session));
                } else {
                    debug!("Controller: ignoring SessionClosed for {:?}", session);
                }
            }
            SessionEventKind::Subscribed { msg_id } => {
                sink.emit(&AppEvent::Subscribed { msg_id });
            }
            SessionEventKind::Delivered { msg_id } => {
                sink.emit(&AppEvent::Delivered { msg_id });
            }
            SessionEventKind::MessageReceived(message) => {
                sink.emit(&AppEvent::MessageReceived(message));
            }
        }
    }

    // ── Session bootstrap ─────────────────────────────────────

    fn open_session(&mut self, sink: &mut impl EventSink) {
        let id = SessionId(self.next_session);
        self.next_session = self.next_session.wrapping_add(1);

        info!("Controller: opening session {:?} to {}", id, self.settings.endpoint.url());
        sink.emit(&AppEvent::SessionOpening(id));

        match self.connector.open(id, &self.settings.endpoint) {
            Ok(session) => {
                self.stats.sessions_opened += 1;
                if let Err(SlotOccupied(extra)) = self.link.install(id, session) {
                    warn!("Controller: session slot occupied, discarding {:?}", id);
                    drop(extra);
                }
            }
            Err(e) => {
                warn!("Controller: session open failed: {}", e);
                sink.emit(&AppEvent::SessionOpenFailed(e));
            }
        }
    }

    fn subscribe_control(&mut self, sink: &mut impl EventSink) {
        let topic = self.settings.control_topic.as_str();
        let result = self
            .link
            .subscribe_once(|s| s.subscribe(topic, DeliveryGuarantee::AtMostOnce));
        match result {
            Some(Ok(msg_id)) => {
                info!("Controller: subscribed to '{}' (msg_id={})", topic, msg_id);
                sink.emit(&AppEvent::SubscribeRequested { msg_id });
            }
            Some(Err(e)) => {
                warn!("Controller: subscribe to '{}' failed: {}", topic, e);
                sink.emit(&AppEvent::SubscribeFailed(e));
            }
            None => {}
        }
    }

    /// Allow session opens and open one now if the network is already up.
    pub fn start_session(&mut self, sink: &mut impl EventSink) {
        self.sessions_enabled = true;
        if self.link.state() != ConnectivityState::Down && !self.link.has_session() {
            self.open_session(sink);
        }
        self.pump_events(sink);
    }

    // ── Waiting ───────────────────────────────────────────────

    /// Block until an address is acquired and at least the settle delay
    /// has passed, or until the readiness timeout runs out.
    pub fn await_network_ready(
        &mut self,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) -> GateOutcome {
        let settle = u64::from(self.settings.settle_delay_ms);
        let timeout = u64::from(self.settings.network_ready_timeout_ms);
        let start = clock.now_ms();

        loop {
            self.pump_events(sink);
            let waited = clock.now_ms().saturating_sub(start);
            let network_up = self.link.state() != ConnectivityState::Down;

            if network_up && waited >= settle {
                info!("Controller: network ready after {} ms", waited);
                sink.emit(&AppEvent::NetworkReady { waited_ms: waited });
                return GateOutcome::Ready { waited_ms: waited };
            }
            if waited >= timeout {
                warn!("Controller: no address after {} ms, continuing", waited);
                sink.emit(&AppEvent::NetworkTimeout { waited_ms: waited });
                return GateOutcome::TimedOut { waited_ms: waited };
            }

            let deadline = if network_up { settle } else { timeout };
            clock.sleep_ms((deadline - waited).min(EVENT_POLL_MS));
        }
    }

    /// Block until the broker confirms a session.  Warns periodically
    /// while waiting; never gives up.
    pub fn await_session(&mut self, clock: &impl Clock, sink: &mut impl EventSink) {
        let window = u64::from(self.settings.session_wait_log_ms);
        let mut window_start = clock.now_ms();

        loop {
            self.pump_events(sink);
            if self.link.is_live() {
                return;
            }
            let now = clock.now_ms();
            if now.saturating_sub(window_start) >= window {
                warn!(
                    "Controller: still waiting for broker session (state={:?})",
                    self.link.state()
                );
                window_start = now;
            }
            clock.sleep_ms(EVENT_POLL_MS);
        }
    }

    /// Block until the next tick is due, draining events meanwhile.
    pub fn wait_for_tick(&mut self, clock: &impl Clock, sink: &mut impl EventSink) {
        loop {
            self.pump_events(sink);
            let remaining = self.ticker.remaining_ms(clock.now_ms());
            if remaining == 0 {
                return;
            }
            clock.sleep_ms(remaining.min(EVENT_POLL_MS));
        }
    }

    // ── Sampling-publish loop ─────────────────────────────────

    /// Run one tick: sample and publish if a session is live.
    pub fn tick(
        &mut self,
        probe: &mut impl SensorProbe,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        self.stats.ticks += 1;

        let Some(call) = plan_publish(self.link.is_live(), || probe.sample()) else {
            self.ticker.mark(clock.now_ms());
            self.stats.skipped += 1;
            sink.emit(&AppEvent::TickSkipped);
            return TickOutcome::Skipped;
        };

        match call.reading {
            Reading::Celsius(c) => info!("Temperature: {:.2} \u{00b0}C", c),
            Reading::Failed(e) => {
                self.stats.sensor_failures += 1;
                warn!("Failed to read temperature from MCP9808 ({})", e);
                sink.emit(&AppEvent::SensorFault(e));
            }
        }

        self.ticker.mark(clock.now_ms());
        let topic = self.settings.telemetry_topic.as_str();
        let result = self.link.with_live_session(|s| {
            s.publish(topic, call.payload.as_bytes(), call.guarantee, call.retain)
        });

        match result {
            Some(Ok(msg_id)) => {
                self.stats.published += 1;
                info!("Message published to {}", topic);
                sink.emit(&AppEvent::Published {
                    msg_id,
                    payload: call.payload,
                });
                TickOutcome::Published {
                    reading: call.reading,
                    msg_id,
                }
            }
            Some(Err(error)) => {
                self.stats.publish_errors += 1;
                warn!("Controller: publish to '{}' failed: {}", topic, error);
                sink.emit(&AppEvent::PublishFailed(error));
                TickOutcome::PublishFailed {
                    reading: call.reading,
                    error,
                }
            }
            // The session vanished between planning and publishing.
            None => {
                self.stats.skipped += 1;
                sink.emit(&AppEvent::TickSkipped);
                TickOutcome::Skipped
            }
        }
    }

    /// The permanent foreground loop.  Never returns.
    pub fn run(
        &mut self,
        probe: &mut impl SensorProbe,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) -> ! {
        info!(
            "Controller: entering sampling loop (period={} ms)",
            self.ticker.period_ms()
        );
        loop {
            self.wait_for_tick(clock, sink);
            self.tick(probe, clock, sink);
        }
    }
}

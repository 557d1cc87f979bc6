//! Integration tests for the connectivity-and-telemetry lifecycle.
//!
//! Drive the [`TelemetryController`] through the event bus with a mock
//! broker, a manual clock and a scripted sensor, then assert on the
//! recorded broker calls.

use std::rc::Rc;

use thermolink::app::bus::EventBus;
use thermolink::app::controller::{
    ControllerSettings, GateOutcome, TelemetryController, TickOutcome,
};
use thermolink::app::events::{
    AppEvent, ConnectivityEvent, InboundMessage, SessionEvent, SessionEventKind, SessionId,
};
use thermolink::app::link::ConnectivityState;
use thermolink::app::ports::DeliveryGuarantee;
use thermolink::app::telemetry::{Reading, SENSOR_FAILURE_PAYLOAD};
use thermolink::config::NodeConfig;
use thermolink::error::{CommsError, SensorError};

use super::mock_ports::{
    FakeClock, MockConnector, MockProbe, RecordingSink, SharedLog, leak_bus,
};

struct Rig {
    bus: &'static EventBus,
    clock: Rc<FakeClock>,
    log: SharedLog,
    ctl: TelemetryController<'static, MockConnector>,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        let bus = leak_bus();
        let clock = FakeClock::new(bus);
        let (connector, log) = MockConnector::new(Rc::clone(&clock));
        let settings = ControllerSettings::from(&NodeConfig::default());
        Self {
            bus,
            clock,
            log,
            ctl: TelemetryController::new(settings, bus, connector),
            sink: RecordingSink::default(),
        }
    }

    /// Address acquired, sessions enabled, first session opened (not live).
    fn network_up(&mut self) {
        self.bus.post(ConnectivityEvent::AddressAcquired);
        self.ctl.start_session(&mut self.sink);
    }

    fn session_event(&mut self, id: u32, kind: SessionEventKind) {
        self.bus.post(SessionEvent {
            session: SessionId(id),
            kind,
        });
        self.ctl.pump_events(&mut self.sink);
    }

    fn connectivity(&mut self, ev: ConnectivityEvent) {
        self.bus.post(ev);
        self.ctl.pump_events(&mut self.sink);
    }

    /// Network up and session 1 live.
    fn live(&mut self) {
        self.network_up();
        self.session_event(1, SessionEventKind::Opened);
        assert_eq!(self.ctl.state(), ConnectivityState::SessionUp);
    }

    fn tick(&mut self, probe: &mut MockProbe) -> TickOutcome {
        self.ctl.tick(probe, &*self.clock, &mut self.sink)
    }

    fn probe(&self, celsius: f32) -> MockProbe {
        MockProbe::steady(Rc::clone(&self.clock), celsius)
    }

    fn opens(&self) -> usize {
        self.log.borrow().opens.len()
    }

    fn publishes(&self) -> Vec<String> {
        self.log
            .borrow()
            .publishes
            .iter()
            .map(|p| p.payload.clone())
            .collect()
    }
}

// ── Scenarios ─────────────────────────────────────────────────

#[test]
fn scenario_join_open_and_publish_reading() {
    let mut rig = Rig::new();
    rig.live();
    let mut probe = rig.probe(21.37);

    let outcome = rig.tick(&mut probe);

    assert!(matches!(
        outcome,
        TickOutcome::Published {
            reading: Reading::Celsius(_),
            ..
        }
    ));
    let log = rig.log.borrow();
    assert_eq!(log.publishes.len(), 1);
    let p = &log.publishes[0];
    assert_eq!(p.payload, "21.37");
    assert_eq!(p.topic, "/nodejs/mqtt");
    assert_eq!(p.guarantee, DeliveryGuarantee::AtLeastOnce);
    assert!(!p.retain);
    assert_eq!(log.endpoints, vec!["mqtt://broker.emqx.io:1883".to_string()]);
}

#[test]
fn scenario_sensor_failure_publishes_literal() {
    let mut rig = Rig::new();
    rig.live();
    let mut probe = rig.probe(0.0).then(Err(SensorError::BusFault));

    let outcome = rig.tick(&mut probe);

    assert_eq!(
        outcome,
        TickOutcome::Published {
            reading: Reading::Failed(SensorError::BusFault),
            msg_id: 2,
        }
    );
    assert_eq!(rig.publishes(), vec![SENSOR_FAILURE_PAYLOAD.to_string()]);
    assert_eq!(rig.ctl.stats().sensor_failures, 1);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::SensorFault(SensorError::BusFault))),
        1
    );

    // The loop keeps going after a failed read.
    rig.clock.advance(1000);
    rig.tick(&mut probe);
    assert_eq!(rig.publishes().len(), 2);
    assert_eq!(rig.publishes()[1], "0.00");
}

#[test]
fn scenario_session_close_suppresses_publishes_until_reopened() {
    let mut rig = Rig::new();
    rig.live();
    let mut probe = rig.probe(20.0);
    rig.tick(&mut probe);
    assert_eq!(rig.publishes().len(), 1);

    rig.session_event(1, SessionEventKind::Closed);
    assert_eq!(rig.ctl.state(), ConnectivityState::NetworkUp);
    // The handle is kept; the client reconnects on its own.
    assert!(rig.ctl.link().has_session());

    for _ in 0..5 {
        rig.clock.advance(1000);
        assert_eq!(rig.tick(&mut probe), TickOutcome::Skipped);
    }
    assert_eq!(rig.publishes().len(), 1);
    assert_eq!(rig.ctl.stats().skipped, 5);

    rig.session_event(1, SessionEventKind::Opened);
    rig.clock.advance(1000);
    rig.tick(&mut probe);
    assert_eq!(rig.publishes().len(), 2);
    // Re-subscribed once on the reconnect; no new open was issued.
    assert_eq!(rig.log.borrow().subscribes.len(), 2);
    assert_eq!(rig.opens(), 1);
}

#[test]
fn scenario_network_loss_and_recovery_opens_exactly_one_session() {
    let mut rig = Rig::new();
    rig.live();
    assert_eq!(rig.opens(), 1);

    rig.connectivity(ConnectivityEvent::Disconnected);
    assert_eq!(rig.ctl.state(), ConnectivityState::Down);
    assert!(!rig.ctl.link().has_session());
    assert_eq!(rig.log.borrow().alive, 0);

    rig.connectivity(ConnectivityEvent::Connecting);
    rig.connectivity(ConnectivityEvent::Connected);
    rig.connectivity(ConnectivityEvent::AddressAcquired);
    // A duplicate address event must not open a second session.
    rig.connectivity(ConnectivityEvent::AddressAcquired);

    let log = rig.log.borrow();
    assert_eq!(log.opens, vec![SessionId(1), SessionId(2)]);
    assert_eq!(log.max_alive, 1);
    drop(log);

    // A late event from the discarded session cannot activate the new one.
    rig.session_event(1, SessionEventKind::Opened);
    assert!(!rig.ctl.link().is_live());
    rig.session_event(2, SessionEventKind::Opened);
    assert!(rig.ctl.link().is_live());
}

// ── Invariants ────────────────────────────────────────────────

#[test]
fn replayed_session_opened_does_not_resubscribe() {
    let mut rig = Rig::new();
    rig.live();
    rig.session_event(1, SessionEventKind::Opened);
    rig.session_event(1, SessionEventKind::Opened);

    let log = rig.log.borrow();
    assert_eq!(log.subscribes.len(), 1);
    assert_eq!(log.subscribes[0].topic, "/nodejs/mqtt");
    assert_eq!(log.subscribes[0].guarantee, DeliveryGuarantee::AtMostOnce);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::SessionOpened(_))), 1);
}

#[test]
fn no_publish_before_session_confirmed() {
    let mut rig = Rig::new();
    let mut probe = rig.probe(20.0);

    // Down, no handle.
    assert_eq!(rig.tick(&mut probe), TickOutcome::Skipped);

    // Handle installed but the broker has not confirmed it yet.
    rig.network_up();
    assert!(rig.ctl.link().has_session());
    assert_eq!(rig.tick(&mut probe), TickOutcome::Skipped);

    assert!(rig.publishes().is_empty());
    assert_eq!(probe.samples, 0);
}

#[test]
fn open_failure_is_retried_on_next_address() {
    let mut rig = Rig::new();
    rig.log.borrow_mut().fail_next_open = true;
    rig.network_up();

    assert!(!rig.ctl.link().has_session());
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::SessionOpenFailed(CommsError::SessionOpenFailed)
        )),
        1
    );

    rig.connectivity(ConnectivityEvent::Disconnected);
    rig.connectivity(ConnectivityEvent::AddressAcquired);
    assert_eq!(rig.opens(), 2);
    assert!(rig.ctl.link().has_session());
}

#[test]
fn publish_failure_loses_the_tick_but_not_the_loop() {
    let mut rig = Rig::new();
    rig.live();
    let mut probe = rig.probe(18.5);

    rig.log.borrow_mut().fail_publish = true;
    assert!(matches!(
        rig.tick(&mut probe),
        TickOutcome::PublishFailed {
            error: CommsError::PublishFailed,
            ..
        }
    ));

    rig.log.borrow_mut().fail_publish = false;
    rig.clock.advance(1000);
    rig.tick(&mut probe);
    assert_eq!(rig.publishes(), vec!["18.50".to_string()]);

    let stats = rig.ctl.stats();
    assert_eq!(stats.ticks, 2);
    assert_eq!(stats.published, 1);
    assert_eq!(stats.publish_errors, 1);
}

#[test]
fn subscribe_failure_is_reported_once() {
    let mut rig = Rig::new();
    rig.log.borrow_mut().fail_subscribe = true;
    rig.live();
    rig.session_event(1, SessionEventKind::Opened);

    assert_eq!(rig.log.borrow().subscribes.len(), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::SubscribeFailed(_))),
        1
    );
}

#[test]
fn stale_close_is_ignored() {
    let mut rig = Rig::new();
    rig.live();
    rig.session_event(9, SessionEventKind::Closed);
    assert_eq!(rig.ctl.state(), ConnectivityState::SessionUp);
}

#[test]
fn inbound_message_is_surfaced_truncated() {
    let mut rig = Rig::new();
    rig.live();
    let big = vec![b'x'; 300];
    rig.session_event(
        1,
        SessionEventKind::MessageReceived(InboundMessage::new("/nodejs/mqtt", &big)),
    );

    let msg = rig
        .sink
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::MessageReceived(m) => Some(m.clone()),
            _ => None,
        })
        .expect("message surfaced");
    assert_eq!(msg.topic.as_str(), "/nodejs/mqtt");
    assert_eq!(msg.payload.len(), 256);
    assert!(msg.truncated);
}

// ── Cadence ───────────────────────────────────────────────────

#[test]
fn publishes_are_at_least_one_period_apart_even_after_a_stall() {
    let mut rig = Rig::new();
    rig.live();
    let mut probe = rig.probe(22.0);
    probe.read_ms = 300;

    for i in 0..10 {
        rig.ctl.wait_for_tick(&*rig.clock, &mut rig.sink);
        if i == 4 {
            // A stalled iteration: 3.5 periods pass before the sample.
            rig.clock.advance(3500);
        }
        rig.tick(&mut probe);
    }

    let log = rig.log.borrow();
    assert_eq!(log.publishes.len(), 10);
    for pair in log.publishes.windows(2) {
        let gap = pair[1].at_ms - pair[0].at_ms;
        assert!(gap >= 1000, "publishes {} ms apart", gap);
    }
}

#[test]
fn wait_for_tick_keeps_draining_events() {
    let mut rig = Rig::new();
    rig.live();
    let mut probe = rig.probe(22.0);
    rig.tick(&mut probe);

    let now = rig.clock.now();
    rig.clock.schedule(now + 400, ConnectivityEvent::Disconnected);
    rig.ctl.wait_for_tick(&*rig.clock, &mut rig.sink);

    assert_eq!(rig.ctl.state(), ConnectivityState::Down);
    assert_eq!(rig.tick(&mut probe), TickOutcome::Skipped);
}

// ── Startup gate ──────────────────────────────────────────────

#[test]
fn gate_holds_settle_delay_after_early_address() {
    let mut rig = Rig::new();
    rig.clock.schedule(700, ConnectivityEvent::AddressAcquired);

    let outcome = rig.ctl.await_network_ready(&*rig.clock, &mut rig.sink);
    assert_eq!(outcome, GateOutcome::Ready { waited_ms: 2000 });
    assert_eq!(rig.opens(), 0);

    rig.ctl.start_session(&mut rig.sink);
    assert_eq!(rig.opens(), 1);
}

#[test]
fn gate_opens_on_late_address_before_timeout() {
    let mut rig = Rig::new();
    rig.clock.schedule(3000, ConnectivityEvent::AddressAcquired);

    let outcome = rig.ctl.await_network_ready(&*rig.clock, &mut rig.sink);
    assert_eq!(outcome, GateOutcome::Ready { waited_ms: 3000 });
}

#[test]
fn gate_timeout_defers_session_until_address() {
    let mut rig = Rig::new();

    let outcome = rig.ctl.await_network_ready(&*rig.clock, &mut rig.sink);
    assert_eq!(outcome, GateOutcome::TimedOut { waited_ms: 15_000 });

    rig.ctl.start_session(&mut rig.sink);
    assert_eq!(rig.opens(), 0);

    rig.connectivity(ConnectivityEvent::AddressAcquired);
    assert_eq!(rig.opens(), 1);
}

#[test]
fn await_session_returns_once_broker_confirms() {
    let mut rig = Rig::new();
    rig.network_up();
    rig.clock.schedule(
        5000,
        SessionEvent {
            session: SessionId(1),
            kind: SessionEventKind::Opened,
        },
    );

    rig.ctl.await_session(&*rig.clock, &mut rig.sink);
    assert!(rig.ctl.link().is_live());
    assert_eq!(rig.clock.now(), 5000);
}

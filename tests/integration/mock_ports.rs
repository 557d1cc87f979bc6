//! Mock adapters for controller integration tests.
//!
//! The broker mock records every open / subscribe / publish in shared
//! state so tests can assert on the full call history after the
//! controller has taken ownership of the connector.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use thermolink::app::bus::EventBus;
use thermolink::app::events::{AppEvent, ControllerEvent, SessionId};
use thermolink::app::ports::{
    BrokerConnector, BrokerSession, Clock, DeliveryGuarantee, EventSink, SensorProbe,
};
use thermolink::config::BrokerEndpoint;
use thermolink::error::{CommsError, SensorError};

// ── Broker call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PublishRecord {
    pub session: SessionId,
    pub at_ms: u64,
    pub topic: String,
    pub payload: String,
    pub guarantee: DeliveryGuarantee,
    pub retain: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeRecord {
    pub session: SessionId,
    pub topic: String,
    pub guarantee: DeliveryGuarantee,
}

#[derive(Default)]
pub struct BrokerLog {
    pub opens: Vec<SessionId>,
    pub endpoints: Vec<String>,
    pub subscribes: Vec<SubscribeRecord>,
    pub publishes: Vec<PublishRecord>,
    pub fail_next_open: bool,
    pub fail_publish: bool,
    pub fail_subscribe: bool,
    /// Sessions currently alive (created and not yet dropped).
    pub alive: u32,
    pub max_alive: u32,
}

pub type SharedLog = Rc<RefCell<BrokerLog>>;

// ── MockConnector ─────────────────────────────────────────────

pub struct MockConnector {
    pub log: SharedLog,
    clock: Rc<FakeClock>,
}

#[allow(dead_code)]
impl MockConnector {
    pub fn new(clock: Rc<FakeClock>) -> (Self, SharedLog) {
        let log = SharedLog::default();
        (
            Self {
                log: Rc::clone(&log),
                clock,
            },
            log,
        )
    }
}

impl BrokerConnector for MockConnector {
    type Session = MockSession;

    fn open(&mut self, id: SessionId, endpoint: &BrokerEndpoint) -> Result<MockSession, CommsError> {
        let mut log = self.log.borrow_mut();
        log.opens.push(id);
        log.endpoints.push(endpoint.url());
        if log.fail_next_open {
            log.fail_next_open = false;
            return Err(CommsError::SessionOpenFailed);
        }
        log.alive += 1;
        log.max_alive = log.max_alive.max(log.alive);
        Ok(MockSession {
            id,
            log: Rc::clone(&self.log),
            clock: Rc::clone(&self.clock),
            next_msg_id: 0,
        })
    }
}

pub struct MockSession {
    id: SessionId,
    log: SharedLog,
    clock: Rc<FakeClock>,
    next_msg_id: u32,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.log.borrow_mut().alive -= 1;
    }
}

impl BrokerSession for MockSession {
    fn subscribe(&mut self, topic: &str, guarantee: DeliveryGuarantee) -> Result<u32, CommsError> {
        let mut log = self.log.borrow_mut();
        log.subscribes.push(SubscribeRecord {
            session: self.id,
            topic: topic.to_string(),
            guarantee,
        });
        if log.fail_subscribe {
            return Err(CommsError::SubscribeFailed);
        }
        self.next_msg_id += 1;
        Ok(self.next_msg_id)
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        guarantee: DeliveryGuarantee,
        retain: bool,
    ) -> Result<u32, CommsError> {
        let mut log = self.log.borrow_mut();
        if log.fail_publish {
            return Err(CommsError::PublishFailed);
        }
        log.publishes.push(PublishRecord {
            session: self.id,
            at_ms: self.clock.now_ms(),
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            guarantee,
            retain,
        });
        self.next_msg_id += 1;
        Ok(self.next_msg_id)
    }
}

// ── FakeClock ─────────────────────────────────────────────────

/// Manual clock.  `sleep_ms` advances time and delivers any events
/// scheduled to arrive within the slept interval.
pub struct FakeClock {
    now: Cell<u64>,
    bus: &'static EventBus,
    scheduled: RefCell<Vec<(u64, ControllerEvent)>>,
}

#[allow(dead_code)]
impl FakeClock {
    pub fn new(bus: &'static EventBus) -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(0),
            bus,
            scheduled: RefCell::new(Vec::new()),
        })
    }

    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Post `event` on the bus once the clock reaches `at_ms`.
    pub fn schedule(&self, at_ms: u64, event: impl Into<ControllerEvent>) {
        self.scheduled.borrow_mut().push((at_ms, event.into()));
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
        let now = self.now.get();
        let mut scheduled = self.scheduled.borrow_mut();
        let (due, later): (Vec<_>, Vec<_>) = scheduled.drain(..).partition(|(at, _)| *at <= now);
        *scheduled = later;
        for (_, ev) in due {
            self.bus.post(ev);
        }
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

// ── MockProbe ─────────────────────────────────────────────────

/// Returns queued samples in order, then `fallback` forever.
/// Each sample takes `read_ms` of clock time.
pub struct MockProbe {
    pub queue: VecDeque<Result<f32, SensorError>>,
    pub fallback: Result<f32, SensorError>,
    pub samples: u32,
    pub read_ms: u64,
    clock: Rc<FakeClock>,
}

#[allow(dead_code)]
impl MockProbe {
    pub fn steady(clock: Rc<FakeClock>, celsius: f32) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: Ok(celsius),
            samples: 0,
            read_ms: 0,
            clock,
        }
    }

    pub fn then(mut self, sample: Result<f32, SensorError>) -> Self {
        self.queue.push_back(sample);
        self
    }
}

impl SensorProbe for MockProbe {
    fn sample(&mut self) -> Result<f32, SensorError> {
        self.samples += 1;
        self.clock.advance(self.read_ms);
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

/// Leak a fresh bus so each test gets its own `'static` instance.
pub fn leak_bus() -> &'static EventBus {
    Box::leak(Box::new(EventBus::new()))
}

//! Thermolink firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  WifiLink        EspMqttConnector   NvsAdapter   SystemClock │
//! │  (bus producer)  (Broker ports)     (Config)     (Clock)     │
//! │  Mcp9808         LogEventSink                                │
//! │  (SensorProbe)   (EventSink)                                 │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        TelemetryController (pure logic)                │  │
//! │  │  gate · single session · fixed-period publish          │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use thermolink::adapters::log_sink::LogEventSink;
use thermolink::adapters::mqtt::EspMqttConnector;
use thermolink::adapters::nvs::NvsAdapter;
use thermolink::adapters::time::SystemClock;
use thermolink::adapters::wifi::WifiLink;
use thermolink::app::bus::EventBus;
use thermolink::app::controller::{ControllerSettings, GateOutcome, TelemetryController};
use thermolink::app::ports::ConfigPort;
use thermolink::config::NodeConfig;
use thermolink::error::Error;
use thermolink::pins;
use thermolink::sensors::mcp9808::Mcp9808;

/// Shared by the WiFi / MQTT callback contexts and the controller task.
static EVENT_BUS: EventBus = EventBus::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Thermolink v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Persistent storage (erase + retry once) ────────────
    let nvs = NvsAdapter::new()
        .map_err(Error::from)
        .context("persistent storage init")?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            NodeConfig::default()
        }
    };
    config
        .validate()
        .map_err(Error::from)
        .context("node configuration")?;

    // ── 4. WiFi join request ──────────────────────────────────
    let _wifi = WifiLink::start(
        peripherals.modem,
        sysloop.clone(),
        nvs_partition,
        &config,
        &EVENT_BUS,
    )
    .map_err(Error::from)
    .context("WiFi start")?;

    // ── 5. Controller + network gate ──────────────────────────
    let clock = SystemClock::new();
    let mut sink = LogEventSink::new();
    let connector = EspMqttConnector::new(&EVENT_BUS, &config.client_id);
    let mut controller =
        TelemetryController::new(ControllerSettings::from(&config), &EVENT_BUS, connector);

    match controller.await_network_ready(&clock, &mut sink) {
        GateOutcome::Ready { waited_ms } => info!("WiFi was initiated ({} ms)", waited_ms),
        GateOutcome::TimedOut { .. } => {
            warn!("WiFi not ready, broker session deferred until an address arrives");
        }
    }

    // ── 6. Broker session ─────────────────────────────────────
    controller.start_session(&mut sink);

    // ── 7. Sensor bus + MCP9808 ───────────────────────────────
    info!(
        "I2C{}: SDA=GPIO{} SCL=GPIO{} @ {} Hz",
        pins::I2C_PORT,
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        config.i2c_freq_hz
    );
    let i2c = I2cDriver::new(
        peripherals.i2c1,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(Hertz(config.i2c_freq_hz)),
    )
    .map_err(|_| Error::Init("I2C master driver"))
    .context("I2C init")?;
    let mut sensor = Mcp9808::new(i2c, config.sensor_address)
        .map_err(Error::from)
        .context("MCP9808 init")?;

    // ── 8. Sampling loop ──────────────────────────────────────
    controller.await_session(&clock, &mut sink);
    controller.run(&mut sensor, &clock, &mut sink)
}

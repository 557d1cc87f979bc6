//! Application core: pure domain logic, zero I/O.
//!
//! The [`controller`] coordinates network readiness, the single broker
//! session and the fixed-period sampling loop.  All interaction with the
//! radio, the broker client and the sensor bus happens through the
//! **port traits** in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod bus;
pub mod controller;
pub mod events;
pub mod link;
pub mod ports;
pub mod telemetry;
pub mod tick;

//! Sensor drivers.
//!
//! Each driver is generic over `embedded-hal` bus traits and implements
//! [`SensorProbe`](crate::app::ports::SensorProbe) so the controller can
//! sample it without knowing the part.

pub mod mcp9808;

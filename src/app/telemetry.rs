//! Readings and their wire payloads.
//!
//! The payload is a bit-exact contract with the downstream subscriber:
//! either the temperature with exactly two fractional digits (`21.37`,
//! `-4.50`; `.` separator, no exponent, no `+`) or the fixed
//! [`SENSOR_FAILURE_PAYLOAD`] literal.

use core::fmt::Write;

use crate::error::SensorError;

use super::events::Payload;
use super::ports::DeliveryGuarantee;

/// Published in place of a reading when the sensor read fails.
pub const SENSOR_FAILURE_PAYLOAD: &str = "Failed to read temperature from MCP9808";

/// Outcome of one sample, consumed by the tick that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Celsius(f32),
    Failed(SensorError),
}

impl Reading {
    /// Classify a raw sample.  Non-finite values count as a failed read
    /// so the payload contract always holds.
    pub fn from_sample(sample: Result<f32, SensorError>) -> Self {
        match sample {
            Ok(c) if c.is_finite() => Self::Celsius(c),
            Ok(_) => Self::Failed(SensorError::OutOfRange),
            Err(e) => Self::Failed(e),
        }
    }

    pub fn payload(&self) -> Payload {
        let mut out = Payload::new();
        if let Self::Celsius(c) = self {
            if write!(out, "{:.2}", c).is_ok() {
                return out;
            }
            out.clear();
        }
        // The literal is shorter than the payload capacity.
        let _ = out.push_str(SENSOR_FAILURE_PAYLOAD);
        out
    }
}

/// The single publish a tick may issue.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishCall {
    pub reading: Reading,
    pub payload: Payload,
    pub guarantee: DeliveryGuarantee,
    pub retain: bool,
}

/// Decide what one tick publishes.
///
/// Without a live session nothing is sampled and nothing is published.
/// With one, the tick always publishes: the reading, or the failure
/// literal when the sample failed.
pub fn plan_publish(
    session_live: bool,
    sample: impl FnOnce() -> Result<f32, SensorError>,
) -> Option<PublishCall> {
    if !session_live {
        return None;
    }
    let reading = Reading::from_sample(sample());
    Some(PublishCall {
        reading,
        payload: reading.payload(),
        guarantee: DeliveryGuarantee::AtLeastOnce,
        retain: false,
    })
}

//! MCP9808 digital temperature sensor (I2C, ±0.25 °C typical).
//!
//! Generic over any `embedded-hal` 1.0 [`I2c`] bus so the driver runs
//! unchanged on the ESP32 I2C master and against a mock bus in tests.
//!
//! ## Register map (subset)
//!
//! | Reg  | Name            | Expected                 |
//! |------|-----------------|--------------------------|
//! | 0x05 | Ambient temp    | 13-bit two's complement  |
//! | 0x06 | Manufacturer ID | `0x0054`                 |
//! | 0x07 | Device ID/rev   | upper byte `0x04`        |

use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::app::ports::SensorProbe;
use crate::error::SensorError;

pub const REG_AMBIENT_TEMP: u8 = 0x05;
pub const REG_MANUFACTURER_ID: u8 = 0x06;
pub const REG_DEVICE_ID: u8 = 0x07;

pub const MANUFACTURER_ID: u16 = 0x0054;
pub const DEVICE_ID: u8 = 0x04;

/// Convert a raw ambient-temperature register value to °C.
///
/// Bits 15..13 are alert flags and are ignored; bit 12 is the sign.
/// Resolution is 1/16 °C.
pub fn decode_ambient(raw: u16) -> f32 {
    let upper = ((raw >> 8) & 0x1F) as u8;
    let lower = (raw & 0xFF) as u8;
    let mut celsius = f32::from(upper & 0x0F) * 16.0 + f32::from(lower) / 16.0;
    if upper & 0x10 != 0 {
        celsius -= 256.0;
    }
    celsius
}

pub struct Mcp9808<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Mcp9808<I2C> {
    /// Bind to the sensor at `address` and verify its identity.
    pub fn new(i2c: I2C, address: u8) -> Result<Self, SensorError> {
        let mut sensor = Self { i2c, address };

        let manufacturer = sensor.read_register(REG_MANUFACTURER_ID)?;
        let device = (sensor.read_register(REG_DEVICE_ID)? >> 8) as u8;
        if manufacturer != MANUFACTURER_ID || device != DEVICE_ID {
            warn!(
                "MCP9808: unexpected IDs at 0x{:02X} (manufacturer=0x{:04X}, device=0x{:02X})",
                address, manufacturer, device
            );
            return Err(SensorError::UnexpectedDevice {
                manufacturer,
                device,
            });
        }

        info!(
            "MCP9808: found at 0x{:02X} (manufacturer=0x{:04X}, device=0x{:02X})",
            address, manufacturer, device
        );
        Ok(sensor)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Read the ambient temperature in °C.
    pub fn ambient_celsius(&mut self) -> Result<f32, SensorError> {
        let raw = self.read_register(REG_AMBIENT_TEMP)?;
        let celsius = decode_ambient(raw);
        debug!("MCP9808: raw=0x{:04X} -> {:.4} \u{00b0}C", raw, celsius);
        Ok(celsius)
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_register(&mut self, reg: u8) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|_| SensorError::BusFault)?;
        Ok(u16::from_be_bytes(buf))
    }
}

impl<I2C: I2c> SensorProbe for Mcp9808<I2C> {
    fn sample(&mut self) -> Result<f32, SensorError> {
        self.ambient_celsius()
    }
}

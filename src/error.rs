//! Unified error types for the Thermolink firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! bootstrap path's error handling uniform.  All variants are `Copy` so
//! they can be passed through events and logs without allocation.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible bootstrap operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The temperature sensor could not be initialised or read.
    Sensor(SensorError),
    /// A network or broker operation failed.
    Comms(CommsError),
    /// Persistent storage could not be brought up.
    Storage(StorageError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The I2C transaction failed (NACK, arbitration loss, timeout).
    BusFault,
    /// The device at the configured address is not an MCP9808.
    UnexpectedDevice { manufacturer: u16, device: u8 },
    /// The reading is not a finite number.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFault => write!(f, "I2C bus fault"),
            Self::UnexpectedDevice {
                manufacturer,
                device,
            } => write!(
                f,
                "unexpected device (manufacturer=0x{:04x}, device=0x{:02x})",
                manufacturer, device
            ),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiJoinFailed,
    SessionOpenFailed,
    SubscribeFailed,
    PublishFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiJoinFailed => write!(f, "WiFi join failed"),
            Self::SessionOpenFailed => write!(f, "MQTT session open failed"),
            Self::SubscribeFailed => write!(f, "MQTT subscribe failed"),
            Self::PublishFailed => write!(f, "MQTT publish failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

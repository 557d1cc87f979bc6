//! Peripheral pin assignments for the Thermolink node.
//!
//! Single source of truth for the board wiring.  `main` takes the
//! matching `esp-idf-hal` pin singletons; the numbers here are what the
//! boot log reports.

// ---------------------------------------------------------------------------
// MCP9808 temperature sensor (I2C)
// ---------------------------------------------------------------------------

/// I2C controller the sensor bus runs on.
pub const I2C_PORT: u8 = 1;
/// I2C data line.
pub const I2C_SDA_GPIO: i32 = 21;
/// I2C clock line.
pub const I2C_SCL_GPIO: i32 = 22;

//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                     | Connects to             |
//! |------------|--------------------------------|-------------------------|
//! | `log_sink` | EventSink                      | Serial log output       |
//! | `mqtt`     | BrokerConnector, BrokerSession | ESP-IDF MQTT client     |
//! | `nvs`      | ConfigPort                     | NVS / in-memory store   |
//! | `time`     | Clock                          | ESP32 system timer      |
//! | `wifi`     | (posts ConnectivityEvents)     | ESP-IDF WiFi STA        |

pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;

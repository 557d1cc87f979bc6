//! Node configuration parameters
//!
//! All tunable parameters for the Thermolink node.  Compiled defaults
//! match the deployed broker and topic layout; a copy persisted in NVS
//! overrides them at boot.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Broker host and port, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
}

impl BrokerEndpoint {
    /// `mqtt://host:port` URL as understood by the ESP-IDF MQTT client.
    pub fn url(&self) -> String {
        format!("mqtt://{}:{}", self.host, self.port)
    }
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- WiFi ---
    pub wifi_ssid: String,
    pub wifi_password: String,

    // --- Broker ---
    pub broker_host: String,
    pub broker_port: u16,
    /// MQTT client identifier (empty = let the client library pick one)
    pub client_id: String,
    /// Topic readings are published to
    pub telemetry_topic: String,
    /// Topic subscribed to for inbound control messages
    pub control_topic: String,

    // --- Sensor bus ---
    /// MCP9808 7-bit I2C address (0x18..=0x1F depending on A2..A0)
    pub sensor_address: u8,
    /// I2C clock rate (Hz)
    pub i2c_freq_hz: u32,

    // --- Timing ---
    /// Sampling-publish period (milliseconds)
    pub tick_period_ms: u32,
    /// Minimum settle time after the WiFi join request (milliseconds)
    pub settle_delay_ms: u32,
    /// Upper bound on waiting for an IP address at startup (milliseconds)
    pub network_ready_timeout_ms: u32,
    /// Interval between "still waiting for broker" warnings (milliseconds)
    pub session_wait_log_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // WiFi credentials are injected at build time.
            wifi_ssid: option_env!("THERMOLINK_WIFI_SSID").unwrap_or("").to_string(),
            wifi_password: option_env!("THERMOLINK_WIFI_PASS").unwrap_or("").to_string(),

            // Broker
            broker_host: "broker.emqx.io".to_string(),
            broker_port: 1883,
            client_id: String::new(),
            telemetry_topic: "/nodejs/mqtt".to_string(),
            control_topic: "/nodejs/mqtt".to_string(),

            // Sensor bus
            sensor_address: 0x18,
            i2c_freq_hz: 100_000,

            // Timing
            tick_period_ms: 1000,
            settle_delay_ms: 2000,
            network_ready_timeout_ms: 15_000,
            session_wait_log_ms: 10_000,
        }
    }
}

impl NodeConfig {
    pub fn endpoint(&self) -> BrokerEndpoint {
        BrokerEndpoint {
            host: self.broker_host.clone(),
            port: self.broker_port,
        }
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi_ssid.len() > 32 {
            return Err(ConfigError::ValidationFailed("wifi_ssid must be at most 32 bytes"));
        }
        if self.wifi_password.len() > 64 {
            return Err(ConfigError::ValidationFailed(
                "wifi_password must be at most 64 bytes",
            ));
        }
        if self.broker_host.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_host must not be empty"));
        }
        if self.broker_port == 0 {
            return Err(ConfigError::ValidationFailed("broker_port must be non-zero"));
        }
        if !is_publish_topic(&self.telemetry_topic) {
            return Err(ConfigError::ValidationFailed(
                "telemetry_topic must be non-empty and free of wildcards",
            ));
        }
        if self.control_topic.is_empty() || self.control_topic.len() > 64 {
            return Err(ConfigError::ValidationFailed(
                "control_topic must be 1-64 bytes",
            ));
        }
        if !(0x18..=0x1F).contains(&self.sensor_address) {
            return Err(ConfigError::ValidationFailed(
                "sensor_address must be 0x18-0x1F",
            ));
        }
        if !(10_000..=400_000).contains(&self.i2c_freq_hz) {
            return Err(ConfigError::ValidationFailed(
                "i2c_freq_hz must be 10000-400000",
            ));
        }
        if !(100..=3_600_000).contains(&self.tick_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "tick_period_ms must be 100-3600000",
            ));
        }
        if self.settle_delay_ms > self.network_ready_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "settle_delay_ms must not exceed network_ready_timeout_ms",
            ));
        }
        if self.session_wait_log_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "session_wait_log_ms must be non-zero",
            ));
        }
        Ok(())
    }
}

fn is_publish_topic(topic: &str) -> bool {
    !topic.is_empty() && topic.len() <= 64 && !topic.contains(['+', '#'])
}

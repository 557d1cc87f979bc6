//! WiFi station-mode adapter.
//!
//! Joins the configured access point and forwards station status to the
//! controller as [`ConnectivityEvent`]s on the [`EventBus`].  The adapter
//! does not keep its own notion of "connected"; the controller is the
//! single owner of connectivity state.
//!
//! ## cfg gating
//!
//! - **`feature = "espidf"`**: `EspWifi` plus system event loop
//!   subscriptions for WiFi and IP events.
//! - **host**: a simulation that posts the same event sequence on demand.
//!
//! ## Reconnection policy
//!
//! On `StaDisconnected` the adapter immediately issues another connect;
//! there is no backoff.  The controller only sees Disconnected and,
//! later, a fresh AddressAcquired.

use log::info;

use crate::app::bus::EventBus;
use crate::app::events::ConnectivityEvent;
use crate::config::NodeConfig;
use crate::error::CommsError;

#[cfg(feature = "espidf")]
use log::warn;

#[cfg(feature = "espidf")]
use esp_idf_svc::{
    eventloop::{EspSubscription, EspSystemEventLoop, System},
    hal::modem::Modem,
    netif::IpEvent,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent},
};

/// Check SSID/password lengths against what the driver accepts.
pub fn check_credentials(ssid: &str, password: &str) -> Result<(), CommsError> {
    if ssid.is_empty() || ssid.len() > 32 || password.len() > 64 {
        return Err(CommsError::WifiJoinFailed);
    }
    Ok(())
}

pub struct WifiLink {
    bus: &'static EventBus,
    #[cfg(feature = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(feature = "espidf")]
    _subscriptions: (EspSubscription<'static, System>, EspSubscription<'static, System>),
}

impl WifiLink {
    /// Configure station mode and start joining.  Returns as soon as the
    /// join has been requested; progress arrives on the bus.
    #[cfg(feature = "espidf")]
    pub fn start(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        config: &NodeConfig,
        bus: &'static EventBus,
    ) -> Result<Self, CommsError> {
        check_credentials(&config.wifi_ssid, &config.wifi_password)?;

        let mut wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|e| {
            warn!("WiFi: driver init failed: {}", e);
            CommsError::WifiJoinFailed
        })?;

        let auth_method = if config.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: config
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| CommsError::WifiJoinFailed)?,
            password: config
                .wifi_password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::WifiJoinFailed)?,
            auth_method,
            ..Default::default()
        };
        wifi.set_configuration(&Configuration::Client(client))
            .map_err(|e| {
                warn!("WiFi: set_configuration failed: {}", e);
                CommsError::WifiJoinFailed
            })?;

        let wifi_sub = sysloop
            .subscribe::<WifiEvent, _>(move |event| match event {
                WifiEvent::StaStarted => {
                    bus.post(ConnectivityEvent::Connecting);
                    request_connect();
                }
                WifiEvent::StaConnected { .. } => {
                    bus.post(ConnectivityEvent::Connected);
                }
                WifiEvent::StaDisconnected { .. } => {
                    bus.post(ConnectivityEvent::Disconnected);
                    request_connect();
                }
                _ => {}
            })
            .map_err(|_| CommsError::WifiJoinFailed)?;

        let ip_sub = sysloop
            .subscribe::<IpEvent, _>(move |event| {
                if let IpEvent::DhcpIpAssigned { .. } = event {
                    bus.post(ConnectivityEvent::AddressAcquired);
                }
            })
            .map_err(|_| CommsError::WifiJoinFailed)?;

        wifi.start().map_err(|e| {
            warn!("WiFi: start failed: {}", e);
            CommsError::WifiJoinFailed
        })?;
        info!("WiFi: joining '{}'", config.wifi_ssid);

        Ok(Self {
            bus,
            wifi,
            _subscriptions: (wifi_sub, ip_sub),
        })
    }

    /// Host simulation: nothing is joined until the `sim_*` methods run.
    #[cfg(not(feature = "espidf"))]
    pub fn start(config: &NodeConfig, bus: &'static EventBus) -> Result<Self, CommsError> {
        check_credentials(&config.wifi_ssid, &config.wifi_password)?;
        info!("WiFi(sim): joining '{}'", config.wifi_ssid);
        Ok(Self { bus })
    }

    #[cfg(feature = "espidf")]
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    /// Simulate a successful join up to DHCP.
    #[cfg(not(feature = "espidf"))]
    pub fn sim_join(&self) {
        self.bus.post(ConnectivityEvent::Connecting);
        self.bus.post(ConnectivityEvent::Connected);
        self.bus.post(ConnectivityEvent::AddressAcquired);
    }

    /// Simulate losing the AP; the driver immediately retries.
    #[cfg(not(feature = "espidf"))]
    pub fn sim_drop(&self) {
        self.bus.post(ConnectivityEvent::Disconnected);
        self.bus.post(ConnectivityEvent::Connecting);
    }

    pub fn bus(&self) -> &'static EventBus {
        self.bus
    }
}

#[cfg(feature = "espidf")]
fn request_connect() {
    // SAFETY: called from the system event loop after the driver started.
    let ret = unsafe { esp_idf_svc::sys::esp_wifi_connect() };
    if ret != esp_idf_svc::sys::ESP_OK {
        warn!("WiFi: esp_wifi_connect returned {}", ret);
    }
}

//! WiFi station-mode bring-up.
//!
//! Credentials are baked in at build time through the `IOB_WIFI_SSID`
//! and `IOB_WIFI_PASS` environment variables and validated before the
//! driver is touched.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` STA.
//! - **all other targets**: only the credential handling compiles.

use core::fmt;

#[cfg(target_os = "espidf")]
use core::net::Ipv4Addr;
#[cfg(target_os = "espidf")]
use log::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 bytes for WPA2, or empty for open)"
            ),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl core::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        Ok(Self {
            ssid: heapless::String::try_from(ssid).map_err(|()| ConnectivityError::InvalidSsid)?,
            password: heapless::String::try_from(password)
                .map_err(|()| ConnectivityError::InvalidPassword)?,
        })
    }

    /// Credentials compiled into the image.
    pub fn from_build_env() -> Result<Self, ConnectivityError> {
        let ssid = option_env!("IOB_WIFI_SSID").ok_or(ConnectivityError::NoCredentials)?;
        Self::new(ssid, option_env!("IOB_WIFI_PASS").unwrap_or(""))
    }
}

// ───────────────────────────────────────────────────────────────
// Station bring-up (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub type Station = esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>;

/// Connect as a station and wait for an address.
#[cfg(target_os = "espidf")]
pub fn connect_station(
    modem: esp_idf_svc::hal::modem::Modem,
    sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
    creds: &WifiCredentials,
) -> Result<(Station, Ipv4Addr), ConnectivityError> {
    use esp_idf_svc::wifi::{
        AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
    };

    let fail = |e: esp_idf_svc::sys::EspError| {
        warn!("WiFi: {:?}", e);
        ConnectivityError::ConnectionFailed
    };

    let driver = EspWifi::new(modem, sysloop.clone(), nvs).map_err(fail)?;
    let mut wifi = BlockingWifi::wrap(driver, sysloop).map_err(fail)?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: creds.ssid.as_str().try_into().map_err(|()| ConnectivityError::InvalidSsid)?,
        password: creds
            .password
            .as_str()
            .try_into()
            .map_err(|()| ConnectivityError::InvalidPassword)?,
        auth_method: if creds.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))
    .map_err(fail)?;

    info!("WiFi: connecting to '{}'", creds.ssid);
    wifi.start().map_err(fail)?;
    wifi.connect().map_err(fail)?;
    wifi.wait_netif_up().map_err(fail)?;

    let ip = wifi.wifi().sta_netif().get_ip_info().map_err(fail)?.ip;
    info!("WiFi: connected, address {}", ip);
    Ok((wifi, ip))
}

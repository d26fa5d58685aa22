//! Agent configuration
//!
//! Endpoints, timing, and Wi-Fi credentials for the update agent.
//! Defaults match the lab deployment; values can be overridden by a blob
//! stored in NVS (see [`NvsAdapter`](crate::adapters::nvs::NvsAdapter)).

use serde::{Deserialize, Serialize};

/// Firmware tag baked into this build.
///
/// `FW_VERSION=FW-V:2.0.0 cargo build` overrides it; otherwise the tag is
/// derived from the package version.  The `FW-V:` prefix is what the
/// upload server scans the image for.
pub const LOCAL_VERSION: &str = match option_env!("OTA_AGENT_FW_TAG") {
    Some(tag) => tag,
    None => concat!("FW-V:", env!("CARGO_PKG_VERSION")),
};

/// Longest URL accepted in the config.
pub const MAX_URL_LEN: usize = 128;

/// The app task feeds once per park or ack poll; the watchdog budget must
/// cover at least this many of the slower of the two.
pub const WATCHDOG_POLL_MARGIN: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValidationError {
    EmptyVersionUrl,
    EmptyFirmwareUrl,
    UrlNotHttp,
    ZeroInterval(&'static str),
    BufferTooSmall,
    WatchdogTooShort,
}

impl core::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyVersionUrl => write!(f, "version URL is empty"),
            Self::EmptyFirmwareUrl => write!(f, "firmware URL is empty"),
            Self::UrlNotHttp => write!(f, "URLs must start with http:// or https://"),
            Self::ZeroInterval(field) => write!(f, "{} must be non-zero", field),
            Self::BufferTooSmall => write!(f, "HTTP buffer must be at least 512 bytes"),
            Self::WatchdogTooShort => write!(
                f,
                "watchdog_timeout_ms must cover {} park/ack polls",
                WATCHDOG_POLL_MARGIN
            ),
        }
    }
}

/// Core agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    // --- Endpoints ---
    /// URL returning the bare remote version string
    pub version_url: heapless::String<MAX_URL_LEN>,
    /// URL returning the firmware image
    pub firmware_url: heapless::String<MAX_URL_LEN>,

    // --- Timing ---
    /// Delay between poll cycles (milliseconds)
    pub poll_interval_ms: u32,
    /// Sleep between pause-acknowledgement checks (milliseconds)
    pub ack_poll_ms: u32,
    /// Give up waiting for the application task after this long.
    /// `None` waits forever.
    pub ack_timeout_ms: Option<u32>,
    /// Sleep between checks while the application task is parked (milliseconds)
    pub park_poll_ms: u32,
    /// Task watchdog budget for the application task (milliseconds)
    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u32,

    // --- HTTP ---
    /// Socket timeout for a single request (milliseconds)
    pub http_timeout_ms: u32,
    /// Receive buffer handed to the HTTP client (bytes)
    pub http_buffer_size: usize,

    // --- Wi-Fi ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// Connection attempts before giving up; 0 retries forever
    pub wifi_max_attempts: u32,
}

fn default_watchdog_timeout_ms() -> u32 {
    10_000
}

fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            // Endpoints
            version_url: bounded("http://192.168.1.100/version"),
            firmware_url: bounded("http://192.168.1.100/firmware.bin"),

            // Timing
            poll_interval_ms: 5000,
            ack_poll_ms: 10,
            ack_timeout_ms: None,
            park_poll_ms: 10,
            watchdog_timeout_ms: default_watchdog_timeout_ms(),

            // HTTP
            http_timeout_ms: 30_000,
            http_buffer_size: 4096,

            // Wi-Fi
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            wifi_max_attempts: 0,
        }
    }
}

impl AgentConfig {
    /// Range-check every field.  Called before a config is persisted.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.version_url.is_empty() {
            return Err(ConfigValidationError::EmptyVersionUrl);
        }
        if self.firmware_url.is_empty() {
            return Err(ConfigValidationError::EmptyFirmwareUrl);
        }
        for url in [&self.version_url, &self.firmware_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigValidationError::UrlNotHttp);
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigValidationError::ZeroInterval("poll_interval_ms"));
        }
        if self.ack_poll_ms == 0 {
            return Err(ConfigValidationError::ZeroInterval("ack_poll_ms"));
        }
        if self.park_poll_ms == 0 {
            return Err(ConfigValidationError::ZeroInterval("park_poll_ms"));
        }
        if self.ack_timeout_ms == Some(0) {
            return Err(ConfigValidationError::ZeroInterval("ack_timeout_ms"));
        }
        let slowest_poll = self.park_poll_ms.max(self.ack_poll_ms);
        if self.watchdog_timeout_ms / WATCHDOG_POLL_MARGIN < slowest_poll {
            return Err(ConfigValidationError::WatchdogTooShort);
        }
        if self.http_buffer_size < 512 {
            return Err(ConfigValidationError::BufferTooSmall);
        }
        Ok(())
    }

    /// Replace the Wi-Fi credentials (truncates to the field capacity).
    pub fn with_wifi(mut self, ssid: &str, password: &str) -> Self {
        self.wifi_ssid = bounded(ssid);
        self.wifi_password = bounded(password);
        self
    }
}

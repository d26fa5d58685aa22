//! HTTP client adapter.
//!
//! Implements [`HttpPort`] for the version and firmware endpoints.
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::http::client::EspHttpConnection`,
//!   one fresh connection per request.
//! - **all other targets**: no network backend; every request fails with
//!   [`TransportError::Unavailable`].  Host tests use mock ports instead.

use crate::app::ports::{HttpPort, ImageStream};
use crate::error::TransportError;
use crate::update::{MAX_VERSION_LEN, RemoteVersion};

#[cfg(target_os = "espidf")]
use esp_idf_svc::http::Method;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
#[cfg(target_os = "espidf")]
use log::warn;

/// 2xx counts as success.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Parse a `Content-Length` header value.
pub fn parse_content_length(value: Option<&str>) -> Result<u32, TransportError> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .ok_or(TransportError::MissingLength)
}

/// Read a body of at most `MAX_VERSION_LEN` bytes.  One extra byte of
/// headroom detects oversized bodies without buffering them.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn read_version_body(
    mut read: impl FnMut(&mut [u8]) -> Result<usize, TransportError>,
) -> Result<RemoteVersion, TransportError> {
    let mut body = [0u8; MAX_VERSION_LEN + 1];
    let mut len = 0;
    loop {
        if len == body.len() {
            return Err(TransportError::BodyTooLarge);
        }
        match read(&mut body[len..])? {
            0 => break,
            n => len += n,
        }
    }
    RemoteVersion::from_body(&body[..len])
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct EspHttpAdapter {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    timeout_ms: u32,
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    buffer_size: usize,
}

impl EspHttpAdapter {
    pub fn new(config: &crate::config::AgentConfig) -> Self {
        Self {
            timeout_ms: config.http_timeout_ms,
            buffer_size: config.http_buffer_size,
        }
    }

    #[cfg(target_os = "espidf")]
    fn get(&self, url: &str) -> Result<EspHttpConnection, TransportError> {
        let config = Configuration {
            buffer_size: Some(self.buffer_size),
            timeout: Some(core::time::Duration::from_millis(self.timeout_ms as u64)),
            ..Default::default()
        };
        let mut conn = EspHttpConnection::new(&config).map_err(|e| {
            warn!("HTTP: connection init failed: {:?}", e);
            TransportError::ConnectFailed
        })?;
        conn.initiate_request(Method::Get, url, &[]).map_err(|e| {
            warn!("HTTP: GET {} failed: {:?}", url, e);
            TransportError::ConnectFailed
        })?;
        conn.initiate_response().map_err(|e| {
            warn!("HTTP: no response from {}: {:?}", url, e);
            TransportError::ConnectFailed
        })?;
        let status = conn.status();
        if !is_success(status) {
            return Err(TransportError::Status(status));
        }
        Ok(conn)
    }
}

/// Streaming firmware body.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
pub struct FirmwareBody {
    content_length: u32,
    #[cfg(target_os = "espidf")]
    conn: EspHttpConnection,
}

impl ImageStream for FirmwareBody {
    fn content_length(&self) -> u32 {
        self.content_length
    }

    #[cfg(target_os = "espidf")]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.conn.read(buf).map_err(|e| {
            warn!("HTTP: firmware read failed: {:?}", e);
            TransportError::ReadFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(0)
    }
}

impl HttpPort for EspHttpAdapter {
    type Image = FirmwareBody;

    #[cfg(target_os = "espidf")]
    fn fetch_version(&mut self, url: &str) -> Result<RemoteVersion, TransportError> {
        let mut conn = self.get(url)?;
        read_version_body(|buf| conn.read(buf).map_err(|_| TransportError::ReadFailed))
    }

    #[cfg(not(target_os = "espidf"))]
    fn fetch_version(&mut self, _url: &str) -> Result<RemoteVersion, TransportError> {
        Err(TransportError::Unavailable)
    }

    #[cfg(target_os = "espidf")]
    fn open_image(&mut self, url: &str) -> Result<FirmwareBody, TransportError> {
        let conn = self.get(url)?;
        let content_length = parse_content_length(conn.header("Content-Length"))?;
        log::info!("HTTP: firmware response, {} bytes", content_length);
        Ok(FirmwareBody {
            content_length,
            conn,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn open_image(&mut self, _url: &str) -> Result<FirmwareBody, TransportError> {
        Err(TransportError::Unavailable)
    }
}

//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing update events to the ESP-IDF logger
//! (UART / USB-CDC in production).  Failures go out at `warn`, everything
//! else at `info`.

use log::{info, warn};

use crate::app::events::UpdateEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`UpdateEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &UpdateEvent) {
        match event {
            UpdateEvent::FetchFailed => {
                warn!("OTA | version fetch failed, retrying next cycle");
            }
            UpdateEvent::UpToDate { remote } => {
                info!("OTA | up to date (remote={})", remote);
            }
            UpdateEvent::UpdateAvailable { local, remote } => {
                info!("OTA | update available: local={} remote={}", local, remote);
            }
            UpdateEvent::PauseRequested => {
                info!("OTA | pause requested, waiting for app task");
            }
            UpdateEvent::PauseAcknowledged => {
                info!("OTA | app task parked");
            }
            UpdateEvent::DownloadFailed(e) => {
                warn!("OTA | firmware download failed: {}", e);
            }
            UpdateEvent::WriteStarted { expected } => {
                info!("OTA | writing {} bytes", expected);
            }
            UpdateEvent::BeginRefused(e) => match e {
                Some(e) => warn!("OTA | not enough space to begin OTA ({})", e),
                None => warn!("OTA | not enough space to begin OTA"),
            },
            UpdateEvent::WriteComplete { written } => {
                info!("OTA | written {} bytes successfully", written);
            }
            UpdateEvent::LengthMismatch { written, expected } => {
                warn!("OTA | written only {}/{} bytes", written, expected);
            }
            UpdateEvent::Finalized => {
                info!("OTA | update finished");
            }
            UpdateEvent::Failed(failure) => {
                warn!("OTA | update failed [{}]: {}", failure.reason(), failure);
            }
            UpdateEvent::Restarting => {
                info!("OTA | rebooting into new image");
            }
            UpdateEvent::PauseReleased => {
                info!("OTA | app task released");
            }
        }
    }
}

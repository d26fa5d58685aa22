//! Port traits: the hexagonal boundary between the update core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ UpdateMonitor / UpdateExecutor / ApplicationTask
//! ```
//!
//! Driven adapters (HTTP client, OTA flash, reboot, event sinks, config
//! storage) implement these traits.  The coordination core consumes them
//! via generics, so it never touches ESP-IDF directly and every path can be
//! exercised on the host with mocks.

use crate::config::AgentConfig;
use crate::error::{FlashError, TransportError};
use crate::update::RemoteVersion;

// ───────────────────────────────────────────────────────────────
// Network fetch port (driven adapter: HTTP → core)
// ───────────────────────────────────────────────────────────────

/// An open firmware response body.
///
/// The total length must be known before the first read; the body is then
/// consumed incrementally.
pub trait ImageStream {
    /// Advertised total size of the image in bytes.
    fn content_length(&self) -> u32;

    /// Read up to `buf.len()` bytes.  `Ok(0)` marks the end of the stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// HTTP GET capability for the two endpoints the agent consumes.
///
/// Success is any 2xx status.  Implementations do not retry; the monitor
/// simply tries again on the next cycle.
pub trait HttpPort {
    type Image: ImageStream;

    /// Fetch the version endpoint body verbatim.
    fn fetch_version(&mut self, url: &str) -> Result<RemoteVersion, TransportError>;

    /// Start a firmware download and return the streaming body.
    fn open_image(&mut self, url: &str) -> Result<Self::Image, TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Flash-write port (driven adapter: core → OTA partition)
// ───────────────────────────────────────────────────────────────

/// Chunk size used by the provided [`FlashWriter::write_stream`].
pub const STREAM_CHUNK_SIZE: usize = 4096;

/// Write-side port for the inactive firmware slot.
///
/// Partition selection and wear handling live behind this trait.
pub trait FlashWriter {
    /// Open a write transaction for `expected_len` bytes.
    /// Returns `false` when refused (no space, transaction already open).
    fn begin(&mut self, expected_len: u32) -> bool;

    /// Append one chunk to the open transaction.
    fn write(&mut self, chunk: &[u8]) -> Result<(), FlashError>;

    /// Commit the transaction.  Returns `false` if the commit was rejected.
    fn end(&mut self) -> bool;

    /// Whether the last committed write is complete.
    fn is_finished(&self) -> bool;

    /// Most recent error, if any.
    fn last_error(&self) -> Option<FlashError>;

    /// Pump `source` into flash until it is exhausted or a read/write fails.
    /// Returns the number of bytes actually written.
    fn write_stream(&mut self, source: &mut impl ImageStream) -> usize {
        let mut buf = [0u8; STREAM_CHUNK_SIZE];
        let mut written = 0usize;
        loop {
            let n = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    log::warn!("OTA: stream read failed after {} bytes: {}", written, e);
                    break;
                }
            };
            if let Err(e) = self.write(&buf[..n]) {
                log::warn!("OTA: flash write failed after {} bytes: {}", written, e);
                break;
            }
            written += n;
        }
        written
    }
}

// ───────────────────────────────────────────────────────────────
// Reboot port
// ───────────────────────────────────────────────────────────────

/// Full device restart; the bootloader picks the partition to run.
///
/// On hardware this never returns.  Test doubles record the call and
/// return so the transaction outcome can be inspected.
pub trait RebootPort {
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → logging)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`UpdateEvent`](super::events::UpdateEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::UpdateEvent);
}

// ───────────────────────────────────────────────────────────────
// Application workload
// ───────────────────────────────────────────────────────────────

/// One quantum of the device's ordinary work.
///
/// Never called while an update is pending, so implementations may touch
/// flash, NVS, or other shared persistent resources freely.
pub trait Workload {
    fn run_once(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: core ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists agent configuration.
///
/// Implementations MUST call [`AgentConfig::validate`] before persisting.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    fn load(&self) -> Result<AgentConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &AgentConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored blob failed to deserialize.
    Corrupted,
    /// A field failed range validation.
    ValidationFailed(crate::config::ConfigValidationError),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(e) => write!(f, "validation failed: {}", e),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

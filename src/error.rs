//! Error taxonomy for the update agent.
//!
//! Every failure the coordination core can observe maps onto one of the
//! enums below.  None of them escape the poll loop: the monitor and the
//! executor log them, release the pause, and carry on polling.  All
//! variants are `Copy` so they can be stored in a transaction record and
//! forwarded through the event sink without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Transport failures (version or firmware fetch)
// ---------------------------------------------------------------------------

/// A version or firmware fetch did not produce a usable response.
///
/// Recovered locally: the cycle is skipped and retried after the next
/// poll interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The HTTP connection could not be created or the request not sent.
    ConnectFailed,
    /// The server answered with a non-2xx status.
    Status(u16),
    /// The firmware response did not advertise a Content-Length.
    MissingLength,
    /// The version body exceeds the fixed-capacity buffer.
    BodyTooLarge,
    /// The version body is not valid UTF-8.
    InvalidEncoding,
    /// A read on an open response failed.
    ReadFailed,
    /// No network backend is available on this target.
    Unavailable,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "HTTP connection failed"),
            Self::Status(code) => write!(f, "HTTP GET failed, status {code}"),
            Self::MissingLength => write!(f, "response has no Content-Length"),
            Self::BodyTooLarge => write!(f, "version body too large"),
            Self::InvalidEncoding => write!(f, "version body is not UTF-8"),
            Self::ReadFailed => write!(f, "response read failed"),
            Self::Unavailable => write!(f, "no network backend"),
        }
    }
}

// ---------------------------------------------------------------------------
// Flash-write capability errors
// ---------------------------------------------------------------------------

/// Errors reported by a [`FlashWriter`](crate::app::ports::FlashWriter)
/// through `last_error()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    /// Image does not fit the inactive slot (or has zero length).
    InsufficientSpace,
    /// `begin` was called while a write transaction was already open.
    AlreadyActive,
    /// No inactive OTA partition could be selected.
    NoPartition,
    /// The underlying write call failed.
    WriteFailed,
    /// A write was attempted with no open transaction.
    NotActive,
    /// More bytes were offered than `begin` announced.
    Overflow,
    /// Image validation failed at finalize.
    VerifyFailed,
    /// The bootloader could not be pointed at the new partition.
    BootSetFailed,
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientSpace => write!(f, "not enough space for image"),
            Self::AlreadyActive => write!(f, "write transaction already active"),
            Self::NoPartition => write!(f, "no inactive OTA partition"),
            Self::WriteFailed => write!(f, "flash write failed"),
            Self::NotActive => write!(f, "no write transaction active"),
            Self::Overflow => write!(f, "data exceeds announced size"),
            Self::VerifyFailed => write!(f, "image verification failed"),
            Self::BootSetFailed => write!(f, "set boot partition failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction failures
// ---------------------------------------------------------------------------

/// Why an update transaction ended without a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateFailure {
    /// The firmware download could not be started.
    Transport(TransportError),
    /// Flash `begin` was refused (CapacityFailure).
    BeginFailed(Option<FlashError>),
    /// Flash `end` rejected the commit.
    FinalizeFailed(Option<FlashError>),
    /// Commit succeeded but the write was not marked complete.
    IncompleteCommit,
    /// The application task did not acknowledge the pause in time.
    PauseTimeout,
}

impl UpdateFailure {
    /// Short machine-friendly reason tag, used in log lines.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport-failed",
            Self::BeginFailed(_) => "begin-failed",
            Self::FinalizeFailed(_) => "finalize-failed",
            Self::IncompleteCommit => "incomplete-commit",
            Self::PauseTimeout => "pause-timeout",
        }
    }
}

impl fmt::Display for UpdateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}: {e}", self.reason()),
            Self::BeginFailed(Some(e)) | Self::FinalizeFailed(Some(e)) => {
                write!(f, "{}: {e}", self.reason())
            }
            Self::BeginFailed(None) | Self::FinalizeFailed(None) => {
                write!(f, "{}: unknown flash error", self.reason())
            }
            Self::IncompleteCommit => write!(f, "finalized but not marked complete"),
            Self::PauseTimeout => write!(f, "application task did not acknowledge pause"),
        }
    }
}

impl From<TransportError> for UpdateFailure {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Pause rendezvous
// ---------------------------------------------------------------------------

/// A bounded wait on the pause rendezvous expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseTimeout;

impl fmt::Display for PauseTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pause rendezvous timed out")
    }
}

impl From<PauseTimeout> for UpdateFailure {
    fn from(_: PauseTimeout) -> Self {
        Self::PauseTimeout
    }
}

//! Update coordination core.
//!
//! ```text
//!  UpdateMonitor ──(mismatch)──▶ UpdateExecutor ──▶ PauseCoordinator
//!        ▲                              │                  │
//!        └────────── outcome ───────────┘          ApplicationTask
//! ```
//!
//! The monitor decides *whether* to update, the executor performs one
//! transaction, and the pause coordinator keeps the application task off
//! shared resources while flash is being rewritten.

pub mod executor;
pub mod monitor;
pub mod pause;

use core::fmt;

use crate::error::TransportError;

/// Capacity of the remote version buffer.
pub const MAX_VERSION_LEN: usize = 64;

/// Version string fetched from the server for one poll cycle.
///
/// Empty means the fetch failed; it is never a valid version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteVersion(heapless::String<MAX_VERSION_LEN>);

impl RemoteVersion {
    /// The "fetch failed" value.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Take an HTTP body verbatim.  No trimming is applied.
    pub fn from_body(body: &[u8]) -> Result<Self, TransportError> {
        let text = core::str::from_utf8(body).map_err(|_| TransportError::InvalidEncoding)?;
        Self::parse(text)
    }

    pub fn parse(text: &str) -> Result<Self, TransportError> {
        let mut s = heapless::String::new();
        s.push_str(text).map_err(|_| TransportError::BodyTooLarge)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RemoteVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Containment rule: the build is up to date when the local tag contains
/// the remote string.
///
/// `"FW-V:1.0.5"` matches a remote `"1.0.5"`, but also `"1.0"` or `"5"`.
/// An empty remote never matches.
pub fn versions_match(local: &str, remote: &RemoteVersion) -> bool {
    !remote.is_empty() && local.contains(remote.as_str())
}

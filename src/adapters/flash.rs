//! OTA flash adapter.
//!
//! Implements [`FlashWriter`] and [`RebootPort`] for the inactive OTA slot.
//!
//! - **`target_os = "espidf"`**: the `esp-ota` crate.  `begin` opens the
//!   next update partition, `end` finalizes (image verification) and points
//!   the bootloader at it, and `restart` hands over to the new image.
//! - **all other targets**: an in-memory slot that records the image, the
//!   boot-slot switch and restarts.
//!
//! The bootloader is only pointed at the new slot when every announced
//! byte was written.  A short session is still finalized, but the running
//! image stays the boot image.
//!
//! Dropping an open `esp_ota::OtaUpdate` aborts it, so a failed session
//! never leaves a half-written slot marked bootable.

use log::{info, warn};

use crate::app::ports::{FlashWriter, RebootPort};
use crate::error::FlashError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Default slot size for the host simulation (matches a 1.5 MB OTA slot).
#[cfg(not(target_os = "espidf"))]
pub const SIM_SLOT_SIZE: u32 = 0x18_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Idle,
    Writing { expected: u32, written: u32 },
}

pub struct OtaFlashAdapter {
    session: Session,
    finished: bool,
    last_error: Option<FlashError>,
    #[cfg(target_os = "espidf")]
    ota_update: Option<esp_ota::OtaUpdate>,
    #[cfg(not(target_os = "espidf"))]
    slot_size: u32,
    #[cfg(not(target_os = "espidf"))]
    image: Vec<u8>,
    #[cfg(not(target_os = "espidf"))]
    restarts: u32,
    #[cfg(not(target_os = "espidf"))]
    boot_slot_set: bool,
}

impl OtaFlashAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self {
            session: Session::Idle,
            finished: false,
            last_error: None,
            ota_update: None,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self::with_slot_size(SIM_SLOT_SIZE)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn with_slot_size(slot_size: u32) -> Self {
        Self {
            session: Session::Idle,
            finished: false,
            last_error: None,
            slot_size,
            image: Vec::new(),
            restarts: 0,
            boot_slot_set: false,
        }
    }

    /// Simulation: bytes committed to the slot by the last session.
    #[cfg(not(target_os = "espidf"))]
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Simulation: whether the bootloader was pointed at the written slot.
    #[cfg(not(target_os = "espidf"))]
    pub fn boot_slot_set(&self) -> bool {
        self.boot_slot_set
    }

    /// Simulation: number of restarts requested.
    #[cfg(not(target_os = "espidf"))]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    fn fail(&mut self, e: FlashError) -> FlashError {
        self.last_error = Some(e);
        e
    }

    /// Size of the slot the next image will be written to.
    #[cfg(target_os = "espidf")]
    fn slot_size(&self) -> Option<u32> {
        // SAFETY: read-only lookup; the returned pointer refers to the
        // static partition table and is valid for the program lifetime.
        unsafe {
            let part = esp_ota_get_next_update_partition(core::ptr::null());
            if part.is_null() {
                None
            } else {
                Some((*part).size)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn slot_size(&self) -> Option<u32> {
        Some(self.slot_size)
    }

    #[cfg(target_os = "espidf")]
    fn platform_begin(&mut self) -> Result<(), FlashError> {
        let update = esp_ota::OtaUpdate::begin().map_err(|e| {
            warn!("esp-ota begin failed: {:?}", e);
            FlashError::NoPartition
        })?;
        self.ota_update = Some(update);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin(&mut self) -> Result<(), FlashError> {
        self.image.clear();
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_write(&mut self, chunk: &[u8]) -> Result<(), FlashError> {
        let update = self.ota_update.as_mut().ok_or(FlashError::NotActive)?;
        update.write(chunk).map_err(|e| {
            warn!("esp-ota write failed: {:?}", e);
            FlashError::WriteFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_write(&mut self, chunk: &[u8]) -> Result<(), FlashError> {
        self.image.extend_from_slice(chunk);
        Ok(())
    }

    /// Finalize the session; switch the boot slot only when `complete`.
    #[cfg(target_os = "espidf")]
    fn platform_commit(&mut self, complete: bool) -> Result<(), FlashError> {
        let update = self.ota_update.take().ok_or(FlashError::NotActive)?;
        let mut completed = update.finalize().map_err(|e| {
            warn!("esp-ota finalize failed: {:?}", e);
            FlashError::VerifyFailed
        })?;
        if !complete {
            return Ok(());
        }
        completed.set_as_boot_partition().map_err(|e| {
            warn!("esp-ota set_as_boot_partition failed: {:?}", e);
            FlashError::BootSetFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_commit(&mut self, complete: bool) -> Result<(), FlashError> {
        if complete {
            self.boot_slot_set = true;
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_abort(&mut self) {
        self.ota_update.take();
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_abort(&mut self) {
        self.image.clear();
    }
}

impl Default for OtaFlashAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashWriter for OtaFlashAdapter {
    fn begin(&mut self, expected_len: u32) -> bool {
        if matches!(self.session, Session::Writing { .. }) {
            self.fail(FlashError::AlreadyActive);
            return false;
        }
        let Some(capacity) = self.slot_size() else {
            self.fail(FlashError::NoPartition);
            return false;
        };
        if expected_len == 0 || expected_len > capacity {
            warn!("OTA flash: image of {} bytes does not fit slot of {}", expected_len, capacity);
            self.fail(FlashError::InsufficientSpace);
            return false;
        }
        if let Err(e) = self.platform_begin() {
            self.fail(e);
            return false;
        }
        self.session = Session::Writing {
            expected: expected_len,
            written: 0,
        };
        self.finished = false;
        self.last_error = None;
        info!("OTA flash: begin ({} bytes, slot {})", expected_len, capacity);
        true
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), FlashError> {
        let Session::Writing { expected, written } = self.session else {
            return Err(self.fail(FlashError::NotActive));
        };
        let len = u32::try_from(chunk.len()).map_err(|_| self.fail(FlashError::Overflow))?;
        let total = written
            .checked_add(len)
            .filter(|t| *t <= expected)
            .ok_or_else(|| self.fail(FlashError::Overflow))?;
        self.platform_write(chunk).map_err(|e| self.fail(e))?;
        self.session = Session::Writing {
            expected,
            written: total,
        };
        Ok(())
    }

    fn end(&mut self) -> bool {
        let Session::Writing { expected, written } = self.session else {
            self.fail(FlashError::NotActive);
            return false;
        };
        self.session = Session::Idle;
        let complete = written == expected;
        match self.platform_commit(complete) {
            Ok(()) => {
                self.finished = complete;
                if complete {
                    info!("OTA flash: committed {} bytes, boot slot switched", written);
                } else {
                    warn!("OTA flash: finalized {}/{} bytes, boot slot unchanged", written, expected);
                }
                true
            }
            Err(e) => {
                self.fail(e);
                self.platform_abort();
                false
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn last_error(&self) -> Option<FlashError> {
        self.last_error
    }
}

impl RebootPort for OtaFlashAdapter {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        info!("OTA: rebooting into new firmware");
        esp_ota::restart();
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        self.restarts += 1;
        info!("OTA: restart requested (simulation, #{})", self.restarts);
    }
}

// ── Boot banner ───────────────────────────────────────────────

/// Label of the partition the running image was booted from.
#[cfg(target_os = "espidf")]
pub fn running_partition_label() -> heapless::String<16> {
    let mut out = heapless::String::new();
    // SAFETY: the running partition pointer refers to the static
    // partition table; `label` is a null-terminated C string.
    unsafe {
        let part = esp_ota_get_running_partition();
        if part.is_null() {
            let _ = out.push_str("unknown");
            return out;
        }
        let label = core::ffi::CStr::from_ptr((*part).label.as_ptr());
        for ch in label.to_string_lossy().chars() {
            if out.push(ch).is_err() {
                break;
            }
        }
    }
    out
}

#[cfg(not(target_os = "espidf"))]
pub fn running_partition_label() -> heapless::String<16> {
    let mut out = heapless::String::new();
    let _ = out.push_str("sim");
    out
}

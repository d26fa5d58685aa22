//! Task Watchdog Timer (TWDT) guard for the application task.
//!
//! The application task subscribes itself on entry to its loop and feeds on
//! every quantum, parked quanta included, so a long flash write on the other
//! core never trips the watchdog for this task.  The guard also tracks the
//! longest gap between feeds and warns once a gap passes half the budget,
//! which points at a workload quantum that blocks for too long.
//!
//! - **`target_os = "espidf"`**: `esp_task_wdt_*`, unsubscribed on drop.
//! - **all other targets**: gap tracking only.

use std::time::{Duration, Instant};

use log::warn;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

pub struct Watchdog {
    budget: Duration,
    last_feed: Instant,
    longest_gap: Duration,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Subscribe the calling task with a `timeout_ms` budget.
    pub fn new(timeout_ms: u32) -> Self {
        let budget = Duration::from_millis(u64::from(timeout_ms));

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: plain FFI calls; a null handle means "current task".
            let subscribed = unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    warn!("TWDT reconfigure returned {} (may already be configured)", ret);
                }
                esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK
            };
            if subscribed {
                info!("Watchdog: app task subscribed ({}ms budget)", timeout_ms);
            } else {
                warn!("Watchdog: app task not subscribed");
            }
            Self {
                budget,
                last_feed: Instant::now(),
                longest_gap: Duration::ZERO,
                subscribed,
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::debug!("Watchdog(sim): {}ms budget", timeout_ms);
            Self {
                budget,
                last_feed: Instant::now(),
                longest_gap: Duration::ZERO,
            }
        }
    }

    /// Feed the watchdog and record the gap since the previous feed.
    pub fn feed(&mut self) {
        let now = Instant::now();
        let gap = now.duration_since(self.last_feed);
        self.last_feed = now;
        if gap > self.longest_gap {
            self.longest_gap = gap;
            if gap > self.budget / 2 {
                warn!(
                    "Watchdog: {}ms between feeds ({}ms budget)",
                    gap.as_millis(),
                    self.budget.as_millis()
                );
            }
        }

        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: this task was subscribed in `new`.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    /// Longest gap between two feeds seen so far.
    pub fn longest_gap(&self) -> Duration {
        self.longest_gap
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

#[cfg(target_os = "espidf")]
impl Drop for Watchdog {
    fn drop(&mut self) {
        if self.subscribed {
            // SAFETY: removes the subscription made in `new` for this task.
            unsafe {
                esp_task_wdt_delete(core::ptr::null_mut());
            }
        }
    }
}

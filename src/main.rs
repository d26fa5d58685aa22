//! OTA Agent Firmware: Main Entry Point
//!
//! Two pinned tasks share one pause rendezvous:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  core 0: ota-monitor                 core 1: app-task        │
//! │                                                              │
//! │  UpdateMonitor ─▶ UpdateExecutor     ApplicationTask         │
//! │   (EspHttpAdapter, OtaFlashAdapter,   (Heartbeat workload,   │
//! │    LogEventSink)                       task watchdog)        │
//! │            │                                │                │
//! │            └──── Arc<PauseCoordinator> ─────┘                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use ota_agent::adapters::flash::{self, OtaFlashAdapter};
use ota_agent::adapters::http::EspHttpAdapter;
use ota_agent::adapters::log_sink::LogEventSink;
use ota_agent::adapters::nvs::NvsAdapter;
use ota_agent::adapters::wifi::{self, WifiAdapter};
use ota_agent::app::ports::Workload;
use ota_agent::app::task::ApplicationTask;
use ota_agent::config::{AgentConfig, LOCAL_VERSION};
use ota_agent::drivers::task_pin::{self, APP_TASK, MONITOR_TASK};
use ota_agent::update::executor::UpdateExecutor;
use ota_agent::update::monitor::UpdateMonitor;
use ota_agent::update::pause::PauseCoordinator;

// ── Application workload ──────────────────────────────────────
//
// Placeholder for the device's real job.  Logs a heartbeat so a stalled
// or parked task is visible on the console.

const HEARTBEAT_QUANTUM: Duration = Duration::from_millis(100);
const HEARTBEAT_LOG_EVERY: Duration = Duration::from_secs(5);

struct Heartbeat {
    quanta: u64,
    last_log: Instant,
}

impl Heartbeat {
    fn new() -> Self {
        Self {
            quanta: 0,
            last_log: Instant::now(),
        }
    }
}

impl Workload for Heartbeat {
    fn run_once(&mut self) {
        self.quanta += 1;
        if self.last_log.elapsed() >= HEARTBEAT_LOG_EVERY {
            info!("App: alive ({} quanta)", self.quanta);
            self.last_log = Instant::now();
        }
        std::thread::sleep(HEARTBEAT_QUANTUM);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  OTA agent {:<26}║", LOCAL_VERSION);
    info!("╚══════════════════════════════════════╝");
    info!("*** Running from partition: {} ***", flash::running_partition_label());

    // ── 2. Peripherals and config ─────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let mut config = match NvsAdapter::new(nvs_partition.clone()) {
        Ok(nvs) => nvs.load_or_default(),
        Err(e) => {
            warn!("NVS unavailable ({}), using defaults", e);
            AgentConfig::default()
        }
    };
    if config.wifi_ssid.is_empty() {
        config = config.with_wifi(
            option_env!("WIFI_SSID").unwrap_or_default(),
            option_env!("WIFI_PASS").unwrap_or_default(),
        );
    }
    info!(
        "Config: version={} firmware={} interval={}ms",
        config.version_url, config.firmware_url, config.poll_interval_ms
    );

    // ── 3. Network ────────────────────────────────────────────
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs_partition)?;
    wifi.set_credentials(&config.wifi_ssid, &config.wifi_password)?;
    wifi.connect_with_retry(config.wifi_max_attempts, wifi::RETRY_INTERVAL)?;

    // ── 4. Tasks ──────────────────────────────────────────────
    let pause = Arc::new(PauseCoordinator::new());

    let app = ApplicationTask::from_config(Heartbeat::new(), Arc::clone(&pause), &config);
    let app_handle = task_pin::spawn_on_core(APP_TASK, move || app.run())?;

    let executor = UpdateExecutor::new(Arc::clone(&pause), &config);
    let monitor = UpdateMonitor::new(LOCAL_VERSION, &config, executor);
    let mut http = EspHttpAdapter::new(&config);
    let monitor_handle = task_pin::spawn_on_core(MONITOR_TASK, move || {
        let mut device = OtaFlashAdapter::new();
        let mut sink = LogEventSink::new();
        monitor.run(&mut http, &mut device, &mut sink)
    })?;

    // `wifi` must outlive the tasks; both loops run forever.
    let _wifi = wifi;
    if monitor_handle.join().is_err() || app_handle.join().is_err() {
        warn!("A task exited unexpectedly");
    }
    Ok(())
}

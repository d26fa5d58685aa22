//! Core-pinned thread spawning for the two agent tasks.
//!
//! The update monitor runs on core 0 next to the Wi-Fi and lwIP stacks; the
//! application task gets core 1 to itself.  On ESP-IDF, `std::thread` maps
//! onto FreeRTOS tasks through pthreads, and `esp_pthread_set_cfg()` sets
//! the affinity, priority and stack of the *next* thread created by the
//! calling thread.  The config→spawn pair must therefore not be
//! interleaved with other thread creation on the same thread.

/// ESP32 CPU cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): protocol stacks and the update monitor.
    Pro = 0,
    /// Core 1 (APP_CPU): the application task.
    App = 1,
}

/// Placement for one task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// Null-terminated name (e.g. `"ota-monitor\0"`).
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

pub const MONITOR_TASK: TaskSpec = TaskSpec {
    name: "ota-monitor\0",
    core: Core::Pro,
    priority: 5,
    stack_kb: 16,
};

pub const APP_TASK: TaskSpec = TaskSpec {
    name: "app-task\0",
    core: Core::App,
    priority: 5,
    stack_kb: 8,
};

impl TaskSpec {
    fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Spawn `f` as a thread placed according to `spec`.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    spec: TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    // SAFETY: the config struct is fully initialised by the default
    // constructor; `spec.name` is 'static and null-terminated.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = spec.priority as i32;
        cfg.stack_size = (spec.stack_kb * 1024) as _;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(std::io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

/// Host fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    spec: TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}

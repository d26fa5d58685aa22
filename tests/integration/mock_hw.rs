//! Mock adapters for integration tests.
//!
//! Every port call is recorded so tests can assert on the full history
//! without a network or a flash chip.  `AppHarness` runs a real
//! `ApplicationTask` on its own thread so the pause rendezvous is
//! exercised the way it is on hardware.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use ota_agent::app::events::UpdateEvent;
use ota_agent::app::ports::{EventSink, FlashWriter, HttpPort, ImageStream, RebootPort, Workload};
use ota_agent::app::task::ApplicationTask;
use ota_agent::config::AgentConfig;
use ota_agent::error::{FlashError, TransportError};
use ota_agent::update::RemoteVersion;
use ota_agent::update::pause::PauseCoordinator;

/// Fast timings so tests finish in milliseconds.
pub fn test_config() -> AgentConfig {
    AgentConfig {
        poll_interval_ms: 1,
        ack_poll_ms: 1,
        park_poll_ms: 1,
        ..AgentConfig::default()
    }
}

// ── HTTP ──────────────────────────────────────────────────────

pub struct MockImage {
    advertised: u32,
    body: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ImageStream for MockImage {
    fn content_length(&self) -> u32 {
        self.advertised
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = buf.len().min(self.chunk).min(self.body.len() - self.pos);
        buf[..n].copy_from_slice(&self.body[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Scripted HTTP server.  Version responses are consumed in order; the
/// last one repeats once the script runs out.
pub struct MockHttp {
    versions: VecDeque<Result<RemoteVersion, TransportError>>,
    image: Result<(u32, Vec<u8>), TransportError>,
    pub version_requests: u32,
    pub image_requests: u32,
}

#[allow(dead_code)]
impl MockHttp {
    pub fn serving(version: &str) -> Self {
        Self {
            versions: VecDeque::from([Ok(RemoteVersion::parse(version).unwrap())]),
            image: Err(TransportError::Status(404)),
            version_requests: 0,
            image_requests: 0,
        }
    }

    pub fn failing(e: TransportError) -> Self {
        Self {
            versions: VecDeque::from([Err(e)]),
            image: Err(TransportError::Status(404)),
            version_requests: 0,
            image_requests: 0,
        }
    }

    pub fn then_serving(mut self, version: &str) -> Self {
        self.versions.push_back(Ok(RemoteVersion::parse(version).unwrap()));
        self
    }

    /// Serve `body` advertised with its own length.
    pub fn with_image(self, body: Vec<u8>) -> Self {
        let len = body.len() as u32;
        self.with_short_image(len, body)
    }

    /// Serve `body` advertised as `advertised` bytes.
    pub fn with_short_image(mut self, advertised: u32, body: Vec<u8>) -> Self {
        self.image = Ok((advertised, body));
        self
    }

    pub fn with_image_error(mut self, e: TransportError) -> Self {
        self.image = Err(e);
        self
    }
}

impl HttpPort for MockHttp {
    type Image = MockImage;

    fn fetch_version(&mut self, _url: &str) -> Result<RemoteVersion, TransportError> {
        self.version_requests += 1;
        if self.versions.len() > 1 {
            self.versions.pop_front().unwrap()
        } else {
            self.versions.front().cloned().unwrap()
        }
    }

    fn open_image(&mut self, _url: &str) -> Result<MockImage, TransportError> {
        self.image_requests += 1;
        let (advertised, body) = self.image.clone()?;
        Ok(MockImage {
            advertised,
            body,
            pos: 0,
            chunk: 1000,
        })
    }
}

// ── Flash + reboot ────────────────────────────────────────────

/// Flash writer and reboot capability in one, like the real adapter.
pub struct MockDevice {
    pub accept_begin: bool,
    pub accept_end: bool,
    pub report_finished: bool,
    pub begin_calls: Vec<u32>,
    pub end_calls: u32,
    pub written: Vec<u8>,
    pub restarts: u32,
    pub error: Option<FlashError>,
    /// `update_pending && pause_acknowledged` sampled on every write.
    pub parked_during_write: Vec<bool>,
    pause: Option<Arc<PauseCoordinator>>,
}

#[allow(dead_code)]
impl MockDevice {
    pub fn new() -> Self {
        Self {
            accept_begin: true,
            accept_end: true,
            report_finished: true,
            begin_calls: Vec::new(),
            end_calls: 0,
            written: Vec::new(),
            restarts: 0,
            error: None,
            parked_during_write: Vec::new(),
            pause: None,
        }
    }

    pub fn refusing_begin(mut self, e: FlashError) -> Self {
        self.accept_begin = false;
        self.error = Some(e);
        self
    }

    pub fn rejecting_end(mut self, e: FlashError) -> Self {
        self.accept_end = false;
        self.error = Some(e);
        self
    }

    pub fn never_finishing(mut self) -> Self {
        self.report_finished = false;
        self
    }

    pub fn observing(mut self, pause: &Arc<PauseCoordinator>) -> Self {
        self.pause = Some(Arc::clone(pause));
        self
    }
}

impl FlashWriter for MockDevice {
    fn begin(&mut self, expected_len: u32) -> bool {
        self.begin_calls.push(expected_len);
        self.accept_begin
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), FlashError> {
        if let Some(p) = &self.pause {
            self.parked_during_write
                .push(p.is_update_pending() && p.is_acknowledged());
        }
        self.written.extend_from_slice(chunk);
        Ok(())
    }

    fn end(&mut self) -> bool {
        self.end_calls += 1;
        self.accept_end
    }

    fn is_finished(&self) -> bool {
        self.report_finished
    }

    fn last_error(&self) -> Option<FlashError> {
        self.error
    }
}

impl RebootPort for MockDevice {
    fn restart(&mut self) {
        self.restarts += 1;
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<UpdateEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &UpdateEvent) -> bool {
        self.events.contains(event)
    }

    pub fn position(&self, event: &UpdateEvent) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &UpdateEvent) {
        self.events.push(event.clone());
    }
}

// ── Application task on a real thread ─────────────────────────

/// Counts quanta and flags any quantum that ran while an update was pending.
struct CountingWorkload {
    pause: Arc<PauseCoordinator>,
    quanta: Arc<AtomicU32>,
    violations: Arc<AtomicU32>,
}

impl Workload for CountingWorkload {
    fn run_once(&mut self) {
        if self.pause.is_acknowledged() {
            self.violations.fetch_add(1, Ordering::Relaxed);
        }
        self.quanta.fetch_add(1, Ordering::Relaxed);
        std::thread::sleep(Duration::from_micros(200));
    }
}

pub struct AppHarness {
    stop: Arc<AtomicBool>,
    quanta: Arc<AtomicU32>,
    violations: Arc<AtomicU32>,
    handle: Option<JoinHandle<()>>,
}

#[allow(dead_code)]
impl AppHarness {
    pub fn spawn(pause: &Arc<PauseCoordinator>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let quanta = Arc::new(AtomicU32::new(0));
        let violations = Arc::new(AtomicU32::new(0));
        let workload = CountingWorkload {
            pause: Arc::clone(pause),
            quanta: Arc::clone(&quanta),
            violations: Arc::clone(&violations),
        };
        let mut task = ApplicationTask::new(workload, Arc::clone(pause), Duration::from_millis(1));
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !thread_stop.load(Ordering::Acquire) {
                task.step();
                std::thread::yield_now();
            }
        });
        Self {
            stop,
            quanta,
            violations,
            handle: Some(handle),
        }
    }

    pub fn quanta(&self) -> u32 {
        self.quanta.load(Ordering::Relaxed)
    }

    /// Quanta that ran while the task was supposed to be parked.
    pub fn violations(&self) -> u32 {
        self.violations.load(Ordering::Relaxed)
    }

    /// Block until the workload has run at least `n` more quanta.
    pub fn wait_for_quanta(&self, n: u32) {
        let target = self.quanta() + n;
        while self.quanta() < target {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for AppHarness {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

//! Poll cycle behaviour: when the monitor does and does not start a
//! transaction.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ota_agent::app::events::UpdateEvent;
use ota_agent::app::ports::HttpPort;
use ota_agent::config::AgentConfig;
use ota_agent::error::{FlashError, TransportError, UpdateFailure};
use ota_agent::update::RemoteVersion;
use ota_agent::update::executor::{TransactionOutcome, UpdateExecutor};
use ota_agent::update::monitor::{PollOutcome, UpdateMonitor};
use ota_agent::update::pause::PauseCoordinator;

use crate::mock_hw::{AppHarness, MockDevice, MockHttp, MockImage, RecordingSink, test_config};

const LOCAL: &str = "1.0.5";

fn monitor(local: &'static str) -> (Arc<PauseCoordinator>, AppHarness, UpdateMonitor) {
    let pause = Arc::new(PauseCoordinator::new());
    let app = AppHarness::spawn(&pause);
    let config = test_config();
    let executor = UpdateExecutor::new(Arc::clone(&pause), &config);
    (pause, app, UpdateMonitor::new(local, &config, executor))
}

#[test]
fn matching_version_is_up_to_date() {
    let (_pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::serving("1.0.5");
    let mut device = MockDevice::new();
    let mut sink = RecordingSink::new();

    let outcome = m.poll_cycle(&mut http, &mut device, &mut sink);

    assert_eq!(outcome, PollOutcome::UpToDate);
    assert_eq!(http.image_requests, 0);
    assert!(device.begin_calls.is_empty());
    assert_eq!(m.executor().transactions_started(), 0);
    assert!(sink.contains(&UpdateEvent::UpToDate {
        remote: RemoteVersion::parse("1.0.5").unwrap()
    }));
}

#[test]
fn fetch_failure_takes_no_action() {
    let (pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::failing(TransportError::ConnectFailed);
    let mut device = MockDevice::new();
    let mut sink = RecordingSink::new();

    let outcome = m.poll_cycle(&mut http, &mut device, &mut sink);

    assert_eq!(outcome, PollOutcome::FetchFailed);
    assert_eq!(sink.events, vec![UpdateEvent::FetchFailed]);
    assert_eq!(m.executor().transactions_started(), 0);
    assert!(pause.is_idle());
}

#[test]
fn empty_body_counts_as_fetch_failure() {
    let (_pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::serving("");
    let mut device = MockDevice::new();
    let mut sink = RecordingSink::new();

    assert_eq!(m.poll_cycle(&mut http, &mut device, &mut sink), PollOutcome::FetchFailed);
    assert_eq!(http.image_requests, 0);
}

#[test]
fn fetch_failure_is_retried_next_cycle() {
    let (_pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::failing(TransportError::Status(503)).then_serving("1.0.5");
    let mut device = MockDevice::new();
    let mut sink = RecordingSink::new();

    assert_eq!(m.poll_cycle(&mut http, &mut device, &mut sink), PollOutcome::FetchFailed);
    assert_eq!(m.poll_cycle(&mut http, &mut device, &mut sink), PollOutcome::UpToDate);
    assert_eq!(http.version_requests, 2);
    assert_eq!(m.cycles(), 2);
}

#[test]
fn mismatch_with_refused_begin_fails_without_reboot() {
    let (pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::serving("2.0.9").with_image(vec![0xAA; 2048]);
    let mut device = MockDevice::new().refusing_begin(FlashError::InsufficientSpace);
    let mut sink = RecordingSink::new();

    let PollOutcome::Updated(tx) = m.poll_cycle(&mut http, &mut device, &mut sink) else {
        panic!("expected a transaction");
    };

    let TransactionOutcome::Failed(failure) = tx.outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.reason(), "begin-failed");
    assert!(matches!(failure, UpdateFailure::BeginFailed(_)));
    assert_eq!(device.restarts, 0);
    assert!(pause.is_idle());
}

#[test]
fn mismatch_with_full_image_reboots_exactly_once() {
    let (pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::serving("2.0.9").with_image(vec![0x55; 4096 * 3 + 17]);
    let mut device = MockDevice::new();
    let mut sink = RecordingSink::new();

    let outcome = m.poll_cycle(&mut http, &mut device, &mut sink);

    assert!(matches!(outcome, PollOutcome::Updated(tx) if tx.restarted()));
    assert_eq!(device.restarts, 1);
    assert_eq!(device.written.len(), 4096 * 3 + 17);
    assert!(pause.is_idle());
}

#[test]
fn mismatch_with_short_stream_still_reboots() {
    let (_pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::serving("2.0.9").with_short_image(5_000, vec![1; 3_000]);
    let mut device = MockDevice::new();
    let mut sink = RecordingSink::new();

    let outcome = m.poll_cycle(&mut http, &mut device, &mut sink);

    let PollOutcome::Updated(tx) = outcome else {
        panic!("expected a transaction");
    };
    assert!(tx.length_mismatch());
    assert!(tx.restarted());
    assert_eq!(device.restarts, 1);
}

#[test]
fn one_transaction_per_detected_mismatch() {
    let (_pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::serving("2.0.9")
        .then_serving("1.0.5")
        .then_serving("3.1.0")
        .with_image(vec![0; 32]);
    let mut device = MockDevice::new().never_finishing();
    let mut sink = RecordingSink::new();

    for _ in 0..3 {
        m.poll_cycle(&mut http, &mut device, &mut sink);
    }

    assert_eq!(m.executor().transactions_started(), 2);
    assert_eq!(device.begin_calls.len(), 2);
}

#[test]
fn repeated_up_to_date_polls_never_start_the_executor() {
    let (pause, _app, mut m) = monitor("FW-V:1.0.5");
    let mut http = MockHttp::serving("1.0.5");
    let mut device = MockDevice::new();
    let mut sink = RecordingSink::new();

    for _ in 0..50 {
        assert_eq!(m.poll_cycle(&mut http, &mut device, &mut sink), PollOutcome::UpToDate);
    }

    assert_eq!(m.executor().transactions_started(), 0);
    assert!(device.begin_calls.is_empty());
    assert!(pause.is_idle());
}

#[test]
fn substring_remote_counts_as_up_to_date() {
    let (_pause, _app, mut m) = monitor("FW-V:1.0.5");
    let mut http = MockHttp::serving("1.0");
    let mut device = MockDevice::new();
    let mut sink = RecordingSink::new();

    assert_eq!(m.poll_cycle(&mut http, &mut device, &mut sink), PollOutcome::UpToDate);
}

#[test]
fn remote_containing_local_is_a_mismatch() {
    let (_pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::serving("1.0.5-rc1").with_image(vec![0; 8]);
    let mut device = MockDevice::new().never_finishing();
    let mut sink = RecordingSink::new();

    assert!(matches!(
        m.poll_cycle(&mut http, &mut device, &mut sink),
        PollOutcome::Updated(_)
    ));
}

#[test]
fn flags_are_reset_before_every_cycle() {
    let (pause, _app, mut m) = monitor(LOCAL);
    let mut http = MockHttp::serving("2.0.9")
        .then_serving("2.0.9")
        .then_serving("1.0.5")
        .with_image(vec![7; 100]);
    let mut device = MockDevice::new().rejecting_end(FlashError::VerifyFailed);
    let mut sink = RecordingSink::new();

    for _ in 0..3 {
        assert!(pause.is_idle(), "flags must be down when a cycle starts");
        m.poll_cycle(&mut http, &mut device, &mut sink);
    }
    assert!(pause.is_idle());
    assert_eq!(device.restarts, 0);
}

// ── Monitor loop ──────────────────────────────────────────────

/// Version endpoint that is always down and timestamps every request.
struct UnreachableServer {
    fetched_at: Arc<Mutex<Vec<Instant>>>,
    image_requests: Arc<AtomicU32>,
}

impl HttpPort for UnreachableServer {
    type Image = MockImage;

    fn fetch_version(&mut self, _url: &str) -> Result<RemoteVersion, TransportError> {
        if let Ok(mut log) = self.fetched_at.lock() {
            log.push(Instant::now());
        }
        Err(TransportError::ConnectFailed)
    }

    fn open_image(&mut self, _url: &str) -> Result<MockImage, TransportError> {
        self.image_requests.fetch_add(1, Ordering::Relaxed);
        Err(TransportError::ConnectFailed)
    }
}

#[test]
fn run_keeps_polling_at_the_configured_interval() {
    const INTERVAL: Duration = Duration::from_millis(40);

    let pause = Arc::new(PauseCoordinator::new());
    let config = AgentConfig {
        poll_interval_ms: INTERVAL.as_millis() as u32,
        ..test_config()
    };
    let executor = UpdateExecutor::new(Arc::clone(&pause), &config);
    let monitor = UpdateMonitor::new(LOCAL, &config, executor);

    let fetched_at = Arc::new(Mutex::new(Vec::new()));
    let image_requests = Arc::new(AtomicU32::new(0));
    let mut http = UnreachableServer {
        fetched_at: Arc::clone(&fetched_at),
        image_requests: Arc::clone(&image_requests),
    };

    // `run` never returns; the thread is left behind when the test ends.
    std::thread::spawn(move || {
        let mut device = MockDevice::new();
        let mut sink = RecordingSink::new();
        monitor.run(&mut http, &mut device, &mut sink)
    });
    std::thread::sleep(INTERVAL * 6);

    let stamps = fetched_at.lock().unwrap().clone();
    assert!(stamps.len() >= 3, "only {} polls in six intervals", stamps.len());
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= INTERVAL, "polled again before the interval elapsed");
    }
    assert_eq!(image_requests.load(Ordering::Relaxed), 0);
    assert!(pause.is_idle());
}

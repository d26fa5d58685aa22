//! Pause rendezvous across two real threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ota_agent::update::pause::PauseCoordinator;

use crate::mock_hw::AppHarness;

const POLL: Duration = Duration::from_millis(1);

#[test]
fn acknowledgement_waits_for_the_app_task() {
    let pause = Arc::new(PauseCoordinator::new());
    let observed = Arc::new(AtomicBool::new(false));

    let p = Arc::clone(&pause);
    let o = Arc::clone(&observed);
    let responder = std::thread::spawn(move || {
        while !p.is_update_pending() {
            std::thread::sleep(POLL);
        }
        std::thread::sleep(Duration::from_millis(30));
        o.store(true, Ordering::Release);
        p.acknowledge_pause();
    });

    let started = Instant::now();
    pause.request_pause();
    pause.await_acknowledgement(POLL, None).unwrap();

    assert!(observed.load(Ordering::Acquire), "ack returned before app saw the request");
    assert!(started.elapsed() >= Duration::from_millis(30));
    responder.join().unwrap();
}

#[test]
fn app_task_parks_and_resumes() {
    let pause = Arc::new(PauseCoordinator::new());
    let app = AppHarness::spawn(&pause);
    app.wait_for_quanta(2);

    pause.request_pause();
    pause.await_acknowledgement(POLL, None).unwrap();

    let parked_at = app.quanta();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(app.quanta(), parked_at, "workload ran while parked");

    pause.release_pause();
    pause.await_resumed(POLL, Some(Duration::from_secs(5))).unwrap();
    app.wait_for_quanta(2);
    assert!(pause.is_idle());
    assert_eq!(app.violations(), 0);
}

#[test]
fn repeated_rendezvous_always_returns_to_rest() {
    let pause = Arc::new(PauseCoordinator::new());
    let _app = AppHarness::spawn(&pause);

    for _ in 0..20 {
        pause.request_pause();
        pause.await_acknowledgement(POLL, Some(Duration::from_secs(5))).unwrap();
        pause.release_pause();
        pause.await_resumed(POLL, Some(Duration::from_secs(5))).unwrap();
        assert!(pause.is_idle());
    }
}

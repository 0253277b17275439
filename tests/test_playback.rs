//! End-to-end playback of the built-in scenarios under virtual time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use twinstep::config::{ConfigLoader, Scenario};
use twinstep::observability::EventEmitter;
use twinstep::phase::{EntryCause, Sequencer, StopReason};
use twinstep::presentation::{Consumer, Renderer, View, spawn_consumer};
use twinstep::scenarios;

/// Records every rendered view with the virtual time it was drawn at.
#[derive(Clone)]
struct Recorder {
    start: Instant,
    views: Arc<Mutex<Vec<(Duration, View)>>>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            views: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn take(&self) -> Vec<(Duration, View)> {
        std::mem::take(&mut *self.views.lock().unwrap())
    }
}

impl Renderer for Recorder {
    fn render(&mut self, view: &View) -> std::io::Result<()> {
        self.views
            .lock()
            .unwrap()
            .push((self.start.elapsed(), view.clone()));
        Ok(())
    }
}

fn load(name: &str) -> Arc<Scenario> {
    scenarios::find(name)
        .unwrap()
        .load(&ConfigLoader::with_defaults())
        .unwrap()
        .scenario
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn one_cycle_of_the_comparison_renders_both_diagrams_in_lockstep() {
    let scenario = load("diagnose-system-issue");
    let mut config = scenario.sequencer_config();
    config.max_cycles = Some(1);

    let cancel = CancellationToken::new();
    let (handle, driver) = Sequencer::spawn(config, Arc::new(EventEmitter::noop()), cancel.clone());

    let recorders: Vec<Recorder> = scenario.diagrams.iter().map(|_| Recorder::new()).collect();
    let consumers: Vec<_> = scenario
        .diagrams
        .iter()
        .zip(&recorders)
        .map(|(table, recorder)| {
            spawn_consumer(
                Consumer::new(Arc::clone(table)),
                handle.subscribe(),
                recorder.clone(),
                cancel.clone(),
            )
        })
        .collect();

    assert_eq!(driver.await.unwrap(), StopReason::CyclesCompleted);
    for consumer in consumers {
        consumer.await.unwrap();
    }

    let rag = recorders[0].take();
    let mcp = recorders[1].take();

    // 7 phases plus the loop back to idle
    let phases: Vec<usize> = rag.iter().map(|(_, v)| v.steady.phase).collect();
    assert_eq!(phases, [0, 1, 2, 3, 4, 5, 6, 0]);
    let mcp_phases: Vec<usize> = mcp.iter().map(|(_, v)| v.steady.phase).collect();
    assert_eq!(mcp_phases, phases);

    // Nominal schedule: 1000, 1500, 1000, 2500, 2000, 2000, then 3000 + 1000 settle
    let times: Vec<Duration> = rag.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        times,
        [
            ms(0),
            ms(1000),
            ms(2500),
            ms(3500),
            ms(6000),
            ms(8000),
            ms(10_000),
            ms(14_000)
        ]
    );

    assert_eq!(rag[0].1.steady.status, "System standing by...");
    assert_eq!(
        mcp[3].1.steady.status,
        "Routing: Call GitHub (get_code) & Postgres (get_logs)..."
    );
    assert_eq!(
        mcp[6].1.steady.status,
        "Response: 'The DB is timing out causing auth.ts to fail.'"
    );

    // Packets fire on entry; the looped idle frame carries none
    let labels = |views: &[(Duration, View)], i: usize| -> Vec<String> {
        views[i].1.packets.iter().map(|p| p.label.clone()).collect()
    };
    assert_eq!(labels(&rag, 1), ["Query"]);
    assert_eq!(labels(&mcp, 3), ["Read Code", "Check Logs"]);
    assert!(labels(&rag, 7).is_empty());
}

#[tokio::test(start_paused = true)]
async fn pausing_holds_every_consumer_on_the_same_frame() {
    let scenario = load("minimal");
    let cancel = CancellationToken::new();
    let (handle, _driver) = Sequencer::spawn(
        scenario.sequencer_config(),
        Arc::new(EventEmitter::noop()),
        cancel.clone(),
    );

    let recorder = Recorder::new();
    let consumer = spawn_consumer(
        Consumer::new(Arc::clone(&scenario.diagrams[0])),
        handle.subscribe(),
        recorder.clone(),
        cancel.clone(),
    );

    // Into `input` (1000ms), then pause halfway through it
    tokio::time::sleep(ms(1750)).await;
    handle.pause().unwrap();
    tokio::time::sleep(ms(60_000)).await;

    let views = recorder.take();
    let last = &views.last().unwrap().1;
    assert_eq!(last.steady.phase_name.as_ref(), "input");
    assert!(!last.playing);
    // The paused redraw is the same entry, so no packet replay
    assert!(last.packets.is_empty());
    assert_eq!(handle.current_phase(), 1);

    // Resume restarts input's full 1500ms wait
    handle.play().unwrap();
    let mut rx = handle.subscribe();
    rx.borrow_and_update();
    let resumed_at = Instant::now();
    loop {
        rx.changed().await.unwrap();
        if rx.borrow_and_update().phase == 2 {
            break;
        }
    }
    assert_eq!(resumed_at.elapsed(), ms(1500));

    cancel.cancel();
    consumer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn restart_from_the_terminal_phase_replays_from_idle() {
    let scenario = load("minimal");
    let (handle, _driver) = Sequencer::spawn(
        scenario.sequencer_config(),
        Arc::new(EventEmitter::noop()),
        CancellationToken::new(),
    );
    let mut rx = handle.subscribe();

    // idle + input + action = 5000ms to reach `complete`
    tokio::time::sleep(ms(5500)).await;
    assert_eq!(handle.current_phase(), 3);
    rx.borrow_and_update();

    handle.restart().unwrap();
    rx.changed().await.unwrap();
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.phase, 0);
    assert_eq!(snapshot.cause, EntryCause::Restart);
    assert!(snapshot.playing);

    let start = Instant::now();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().phase, 1);
    assert_eq!(start.elapsed(), ms(1000));
}

#[tokio::test(start_paused = true)]
async fn synced_packets_follow_the_playback_speed() {
    let scenario = load("diagnose-system-issue");
    let mut config = scenario.sequencer_config();
    config.initial_speed = config.speed_range.admit(2.0).unwrap();
    let cancel = CancellationToken::new();
    let (handle, _driver) = Sequencer::spawn(config, Arc::new(EventEmitter::noop()), cancel.clone());

    let recorder = Recorder::new();
    let consumer = spawn_consumer(
        Consumer::new(Arc::clone(scenario.diagram("rag").unwrap())).with_sync_packets(true),
        handle.subscribe(),
        recorder.clone(),
        cancel.clone(),
    );

    // idle lasts 500ms at 2x
    tokio::time::sleep(ms(600)).await;
    cancel.cancel();
    consumer.await.unwrap();

    let views = recorder.take();
    assert_eq!(views[1].0, ms(500));
    assert_eq!(views[1].1.packets[0].travel, ms(750));
}

use std::time::Duration;

use mirror_bench::config::BenchConfig;
use mirror_bench::runner::Estimator;
use tokio::time::Instant;

mod common;
use common::{assert_close, EventLog, RecordingWarmup, ScriptedProbe};

fn estimator(probe: ScriptedProbe, events: EventLog) -> Estimator<ScriptedProbe, RecordingWarmup> {
    Estimator::new(
        probe.with_events(events.clone()),
        RecordingWarmup::new(events),
        &BenchConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn transient_failure_is_trimmed_away() {
    let events = EventLog::default();
    let probe = ScriptedProbe::new(Duration::from_millis(50))
        .failing("paper.x", 1)
        .with_round("paper.x", 2, Duration::from_millis(60));
    let estimator = estimator(probe, events);

    let leg = estimator.measure("https://paper.x/", "Paper accelerated").await;

    assert_eq!(leg.samples.len(), 3);
    assert_close(leg.samples[0], 50.0);
    assert!(leg.samples[1] >= 1000.0, "penalty sample: {}", leg.samples[1]);
    assert_close(leg.samples[2], 60.0);
    assert_close(leg.trimmed_ms, 60.0);
}

#[tokio::test(start_paused = true)]
async fn warmup_precedes_sequential_rounds() {
    let events = EventLog::default();
    let estimator = estimator(ScriptedProbe::new(Duration::from_millis(10)), events.clone());

    estimator.measure("https://papermc.io/", "Paper origin").await;

    let log = events.lock().expect("event log").clone();
    assert_eq!(
        log,
        vec![
            "warmup https://papermc.io/",
            "probe papermc.io r0",
            "probe papermc.io r1",
            "probe papermc.io r2",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn rounds_are_separated_by_pauses_but_not_trailed_by_one() {
    let estimator = estimator(
        ScriptedProbe::new(Duration::from_millis(10)),
        EventLog::default(),
    );

    let start = Instant::now();
    estimator.measure("https://paper.x/", "Paper accelerated").await;

    // three 10 ms rounds plus two 200 ms pauses
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(430) && elapsed < Duration::from_millis(431),
        "unexpected duration: {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn configured_round_count_and_penalty_are_honoured() {
    let config = BenchConfig {
        rounds: 5,
        failure_penalty_ms: 400.0,
        ..BenchConfig::default()
    };
    let probe = ScriptedProbe::new(Duration::from_millis(20)).failing("paper.x", 0);
    let estimator = Estimator::new(probe.clone(), RecordingWarmup::default(), &config);

    let leg = estimator.measure("https://paper.x/", "Paper accelerated").await;

    assert_eq!(leg.samples.len(), 5);
    assert_close(leg.samples[0], 400.0);
    assert_close(leg.trimmed_ms, 20.0);
    assert_eq!(probe.probe_count(), 5);
}

//! Concurrency and shutdown behaviour of the monitor with a stub prober.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use http_monitor::health::{ProbeError, Prober};
use http_monitor::monitor::{HealthEvent, Monitor, MonitorState};
use http_monitor::scheduler::OwnerId;

mod common;

/// Alternates failure/success per URL and counts every probe.
#[derive(Default)]
struct Flapping {
    probes: AtomicU64,
    calls: std::sync::Mutex<HashMap<String, u64>>,
}

impl Prober for Flapping {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(url.to_string()).or_default();
            *n += 1;
            *n
        };
        // Keep probes in flight long enough to overlap with stop()
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.probes.fetch_add(1, Ordering::SeqCst);

        if n % 2 == 1 {
            Err(ProbeError::Status(503))
        } else {
            Ok(())
        }
    }
}

fn url(i: usize) -> String {
    format!("https://endpoint-{}.example", i)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_never_races_with_send() {
    let (monitor, mut rx) = Monitor::new(&common::fast_config(8), Flapping::default());
    let monitor = Arc::new(monitor);
    for i in 0..20 {
        monitor.add_request(OwnerId((i % 3) as i64), url(i)).unwrap();
    }

    let observer = tokio::spawn(async move {
        let mut per_record: HashMap<(OwnerId, String), Vec<HealthEvent>> = HashMap::new();
        while let Some(event) = rx.recv().await {
            per_record
                .entry((event.owner, event.url.clone()))
                .or_default()
                .push(event);
        }
        per_record
    });

    // Mutate the live set while workers are probing
    let mutator = {
        let monitor = monitor.clone();
        tokio::spawn(async move {
            for round in 0..50 {
                let u = url(100 + round);
                monitor.add_request(OwnerId(9), u.clone()).unwrap();
                tokio::task::yield_now().await;
                monitor.remove_request(OwnerId(9), &u).unwrap();
            }
        })
    };

    monitor.start().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    mutator.await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), monitor.stop())
        .await
        .expect("stop should finish")
        .unwrap();
    assert_eq!(monitor.state(), MonitorState::Stopped);

    // No probe (and therefore no send) happens after stop() returned
    let probes_at_stop = monitor_probes(&monitor);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(monitor_probes(&monitor), probes_at_stop);

    // Channel closes once the last worker has gone
    let per_record = tokio::time::timeout(Duration::from_secs(5), observer)
        .await
        .expect("channel should close after stop")
        .unwrap();

    // Per record, transitions alternate and start with a failure
    assert!(!per_record.is_empty());
    for events in per_record.values() {
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.is_recovery(), i % 2 == 1, "out of order: {:?}", events);
        }
    }
}

fn monitor_probes(monitor: &Monitor<Flapping>) -> u64 {
    monitor.prober().probes.load(Ordering::SeqCst)
}

#[tokio::test]
async fn test_idle_monitor_picks_up_late_add() {
    let (monitor, mut rx) = Monitor::new(&common::fast_config(2), Flapping::default());
    monitor.start().unwrap();

    // Workers are waiting on an empty set
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(monitor_probes(&monitor), 0);

    monitor.add_request(OwnerId(1), "https://late.example").unwrap();
    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("late add should be probed")
        .unwrap();
    assert_eq!(event.owner, OwnerId(1));
    assert!(!event.is_recovery());

    // Nobody drains from here on; a dropped receiver must not block stop()
    drop(rx);
    monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_remove_on_empty_set() {
    let (monitor, mut rx) = Monitor::new(&common::fast_config(1), Flapping::default());
    monitor.start().unwrap();

    assert_eq!(monitor.remove_request(OwnerId(2), "https://missing"), Ok(false));

    monitor.stop().await.unwrap();
    assert_eq!(rx.recv().await, None);
}

/// Fails every probe after a delay.
#[derive(Default)]
struct SlowFailing {
    started: AtomicU64,
}

impl Prober for SlowFailing {
    async fn probe(&self, _url: &str) -> Result<(), ProbeError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        Err(ProbeError::Status(503))
    }
}

/// Holds every probe until the gate is closed.
struct Gated {
    gate: Semaphore,
    started: AtomicU64,
}

impl Prober for Gated {
    async fn probe(&self, _url: &str) -> Result<(), ProbeError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _ = self.gate.acquire().await;
        Ok(())
    }
}

async fn wait_for_checks(started: &AtomicU64, at_least: u64) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while started.load(Ordering::SeqCst) < at_least {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("check should start");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readded_endpoint_starts_fresh_history() {
    let (monitor, mut rx) = Monitor::new(&common::fast_config(2), SlowFailing::default());
    monitor.add_request(OwnerId(1), "https://a.example").unwrap();
    monitor.start().unwrap();
    wait_for_checks(&monitor.prober().started, 1).await;

    // Replace the record while its first check is still in flight
    assert_eq!(monitor.remove_request(OwnerId(1), "https://a.example"), Ok(true));
    assert_eq!(monitor.add_request(OwnerId(1), "https://a.example"), Ok(true));

    tokio::time::sleep(Duration::from_millis(700)).await;
    monitor.stop().await.unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    // Only the live record reports; the stale check's failure is dropped
    assert_eq!(
        events,
        vec![HealthEvent::failed(
            OwnerId(1),
            "https://a.example",
            ProbeError::Status(503)
        )]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_inflight_check_does_not_block_mutation() {
    let prober = Gated {
        gate: Semaphore::new(0),
        started: AtomicU64::new(0),
    };
    let (monitor, _rx) = Monitor::new(&common::fast_config(1), prober);
    let monitor = Arc::new(monitor);
    monitor.add_request(OwnerId(1), "https://stuck.example").unwrap();
    monitor.start().unwrap();
    wait_for_checks(&monitor.prober().started, 1).await;

    let mutations = {
        let monitor = monitor.clone();
        tokio::task::spawn_blocking(move || {
            (
                monitor.add_request(OwnerId(2), "https://other.example"),
                monitor.request_exists(OwnerId(2), "https://other.example"),
                monitor.remove_request(OwnerId(2), "https://other.example"),
                monitor.remove_request(OwnerId(1), "https://stuck.example"),
            )
        })
    };
    let results = tokio::time::timeout(Duration::from_secs(1), mutations)
        .await
        .expect("mutations should not wait for the in-flight check")
        .unwrap();
    assert_eq!(results, (Ok(true), Ok(true), Ok(true), Ok(true)));

    // The gated check is still the only one that ever started
    assert_eq!(monitor.prober().started.load(Ordering::SeqCst), 1);

    monitor.prober().gate.close();
    monitor.stop().await.unwrap();
}

//! Registration lifecycle against an in-memory directory, on a paused clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::ScriptedProbe;
use discovery_sidecar::config::LifecycleConfig;
use discovery_sidecar::directory::{DirectoryCall, Instance, MemoryDirectory};
use discovery_sidecar::lifecycle::{Shutdown, SidecarLifecycle, SidecarState};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

struct Harness {
    directory: MemoryDirectory,
    probe: Arc<ScriptedProbe>,
    shutdown: Shutdown,
    task: JoinHandle<SidecarState>,
}

fn local_instance() -> Instance {
    Instance::new("10.0.0.9", 8080, "orders").with_cluster("blue")
}

fn start(directory: MemoryDirectory, alive: bool) -> Harness {
    let probe = ScriptedProbe::new(alive);
    let shutdown = Shutdown::new();
    let lifecycle = SidecarLifecycle::new(
        local_instance(),
        Arc::new(directory.clone()),
        probe.clone(),
        LifecycleConfig::default(),
    );
    let task = tokio::spawn(lifecycle.run(shutdown.subscribe()));
    Harness {
        directory,
        probe,
        shutdown,
        task,
    }
}

impl Harness {
    async fn stop(self) -> (SidecarState, Vec<DirectoryCall>) {
        self.shutdown.trigger();
        let state = self.task.await.unwrap();
        (state, self.directory.calls().await)
    }

    async fn stored(&self) -> Option<Instance> {
        self.directory.get(&local_instance()).await
    }
}

fn count(calls: &[DirectoryCall], pred: fn(&DirectoryCall) -> bool) -> usize {
    calls.iter().filter(|c| pred(c)).count()
}

#[tokio::test(start_paused = true)]
async fn test_not_registered_before_first_successful_probe() {
    let harness = start(MemoryDirectory::new(), false);

    sleep(Duration::from_millis(3500)).await;
    assert!(harness.probe.samples() >= 3);
    assert!(harness.directory.calls().await.is_empty());

    harness.probe.set_alive(true);
    sleep(Duration::from_millis(1000)).await;

    let stored = harness.stored().await.unwrap();
    assert!(stored.enabled);
    assert!(stored.healthy);
    assert_eq!(stored.cluster_name, "blue");

    let (state, calls) = harness.stop().await;
    assert_eq!(state, SidecarState::ShuttingDown);
    assert_eq!(count(&calls, DirectoryCall::is_register), 1);
    assert_eq!(count(&calls, DirectoryCall::is_deregister), 1);
}

#[tokio::test(start_paused = true)]
async fn test_enabled_flag_follows_liveness() {
    let harness = start(MemoryDirectory::new(), true);

    sleep(Duration::from_millis(500)).await;
    assert!(harness.stored().await.unwrap().enabled);

    harness.probe.set_alive(false);
    sleep(Duration::from_millis(1000)).await;
    let stored = harness.stored().await.unwrap();
    assert!(!stored.enabled);
    assert!(stored.healthy);

    harness.probe.set_alive(true);
    sleep(Duration::from_millis(1000)).await;
    assert!(harness.stored().await.unwrap().enabled);

    let (_, calls) = harness.stop().await;
    let flags: Vec<bool> = calls
        .iter()
        .filter_map(|c| match c {
            DirectoryCall::Register { instance, ok: true } => Some(instance.enabled),
            _ => None,
        })
        .collect();
    assert_eq!(flags, vec![true, false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_steady_health_sends_no_updates() {
    let harness = start(MemoryDirectory::new(), true);

    sleep(Duration::from_secs(10)).await;
    assert!(harness.probe.samples() >= 10);

    let (_, calls) = harness.stop().await;
    assert_eq!(count(&calls, DirectoryCall::is_register), 1);
}

#[tokio::test(start_paused = true)]
async fn test_registration_retried_every_second_until_it_sticks() {
    let directory = MemoryDirectory::new();
    directory.fail_registrations(3);
    let started = Instant::now();
    let harness = start(directory, true);

    sleep(Duration::from_millis(2500)).await;
    assert!(harness.stored().await.is_none());

    sleep(Duration::from_millis(1000)).await;
    assert!(harness.stored().await.unwrap().enabled);

    let (_, calls) = harness.stop().await;
    let registrations: Vec<&DirectoryCall> = calls.iter().filter(|c| c.is_register()).collect();
    assert_eq!(registrations.len(), 4);
    assert!(registrations[3].succeeded());
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_disable_retried_until_it_sticks() {
    let harness = start(MemoryDirectory::new(), true);

    sleep(Duration::from_millis(500)).await;
    assert!(harness.stored().await.unwrap().enabled);

    // The tick at t=1s sees the app dead; three updates fail, the fourth lands at t=4s.
    harness.directory.fail_registrations(3);
    harness.probe.set_alive(false);

    sleep(Duration::from_millis(3000)).await;
    assert!(harness.stored().await.unwrap().enabled);

    sleep(Duration::from_millis(1000)).await;
    assert!(!harness.stored().await.unwrap().enabled);

    let (_, calls) = harness.stop().await;
    let disables: Vec<bool> = calls
        .iter()
        .filter_map(|c| match c {
            DirectoryCall::Register { instance, ok } if !instance.enabled => Some(*ok),
            _ => None,
        })
        .collect();
    assert_eq!(disables, vec![false, false, false, true]);
    assert_eq!(count(&calls, DirectoryCall::is_deregister), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_pending_retry() {
    let directory = MemoryDirectory::new();
    directory.fail_registrations(usize::MAX);
    let harness = start(directory, true);

    sleep(Duration::from_millis(1500)).await;
    let (state, calls) = harness.stop().await;

    assert_eq!(state, SidecarState::ShuttingDown);
    assert_eq!(count(&calls, DirectoryCall::is_register), 2);
    // Never registered, so nothing to remove.
    assert_eq!(count(&calls, DirectoryCall::is_deregister), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_deregistration_is_not_retried() {
    let directory = MemoryDirectory::new();
    directory.fail_deregistrations(5);
    let harness = start(directory, true);

    sleep(Duration::from_millis(500)).await;
    let (state, calls) = harness.stop().await;

    assert_eq!(state, SidecarState::ShuttingDown);
    let deregistrations: Vec<&DirectoryCall> = calls.iter().filter(|c| c.is_deregister()).collect();
    assert_eq!(deregistrations.len(), 1);
    assert!(!deregistrations[0].succeeded());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_unhealthy_still_deregisters() {
    let harness = start(MemoryDirectory::new(), true);

    sleep(Duration::from_millis(500)).await;
    harness.probe.set_alive(false);
    sleep(Duration::from_millis(1000)).await;
    assert!(!harness.stored().await.unwrap().enabled);

    let directory = harness.directory.clone();
    let (_, calls) = harness.stop().await;
    assert_eq!(count(&calls, DirectoryCall::is_deregister), 1);
    assert!(directory.get(&local_instance()).await.is_none());
}

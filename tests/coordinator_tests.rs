//! One-shot migration coordinator tests
//!
//! The chain must run exactly once however many callers wait on it, and its
//! outcome must be what every later caller and readiness check observes.
mod common;

use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use common::*;
use netabase_versioning::prelude::*;
use tokio_util::sync::CancellationToken;

type Runner = dyn Fn(
        &CancellationToken,
        &Arc<dyn Datastore>,
        &VersionedMigrationList,
        &VersioningConfig,
    ) -> VersioningResult<VersionKey>
    + Send
    + Sync;

fn counting(
    runs: Arc<AtomicUsize>,
    result: fn(&VersioningConfig) -> VersioningResult<VersionKey>,
) -> Box<Runner> {
    Box::new(
        move |_: &CancellationToken,
              _: &Arc<dyn Datastore>,
              _: &VersionedMigrationList,
              config: &VersioningConfig| {
            runs.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            result(config)
        },
    )
}

fn coordinator_with(runner: Box<Runner>) -> MigrationCoordinator {
    MigrationCoordinator::with_runner(
        Arc::new(MemoryStore::new()),
        VersionedMigrationList::default(),
        VersioningConfig::new("1"),
        move |cancel: &CancellationToken,
              store: &Arc<dyn Datastore>,
              migrations: &VersionedMigrationList,
              config: &VersioningConfig| runner(cancel, store, migrations, config),
    )
}

fn reach_target(config: &VersioningConfig) -> VersioningResult<VersionKey> {
    Ok(config.target.clone())
}

fn unversioned(_: &VersioningConfig) -> VersioningResult<VersionKey> {
    Err(VersioningError::Unversioned)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_migrations_run_once_for_many_callers() {
    let runs = Arc::new(AtomicUsize::new(0));
    let coordinator = Arc::new(coordinator_with(counting(runs.clone(), reach_target)));

    let callers: Vec<_> = (0..16)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.migrate(&CancellationToken::new()).await })
        })
        .collect();
    for caller in callers {
        caller.await.unwrap().unwrap();
    }

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(coordinator.is_finished());

    coordinator.migrate(&CancellationToken::new()).await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ready_error_follows_the_run() {
    let runs = Arc::new(AtomicUsize::new(0));
    let coordinator = coordinator_with(counting(runs, reach_target));

    assert!(matches!(
        coordinator.ready_error(),
        Err(VersioningError::MigrationsNotRun)
    ));
    assert!(!coordinator.is_finished());

    coordinator.migrate(&CancellationToken::new()).await.unwrap();

    assert!(coordinator.ready_error().is_ok());
}

#[tokio::test]
async fn test_failed_run_is_replayed_to_every_caller() {
    let runs = Arc::new(AtomicUsize::new(0));
    let coordinator = coordinator_with(counting(runs.clone(), unversioned));

    let first = coordinator
        .migrate(&CancellationToken::new())
        .await
        .unwrap_err();
    let second = coordinator
        .migrate(&CancellationToken::new())
        .await
        .unwrap_err();

    for err in [&first, &second] {
        assert!(matches!(err, VersioningError::MigrationFailed(_)));
        assert!(matches!(err.root(), VersioningError::Unversioned));
    }
    assert_eq!(
        first.to_string(),
        "error migrating database: cannot migrate from an unversioned database"
    );
    let ready = coordinator.ready_error().unwrap_err();
    assert!(matches!(ready.root(), VersioningError::Unversioned));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_caller_cancellation_leaves_the_run_going() {
    let (release, gate) = mpsc::channel::<()>();
    let gate = Mutex::new(gate);
    let coordinator = coordinator_with(Box::new(
        move |_: &CancellationToken,
              _: &Arc<dyn Datastore>,
              _: &VersionedMigrationList,
              config: &VersioningConfig| {
            if let Ok(gate) = gate.lock() {
                let _ = gate.recv();
            }
            Ok(config.target.clone())
        },
    ));

    let impatient = CancellationToken::new();
    impatient.cancel();
    let err = coordinator.migrate(&impatient).await.unwrap_err();
    assert!(matches!(err, VersioningError::Cancelled));
    assert!(matches!(
        coordinator.ready_error(),
        Err(VersioningError::MigrationsNotRun)
    ));

    release.send(()).unwrap();
    coordinator.migrate(&CancellationToken::new()).await.unwrap();
    assert!(coordinator.ready_error().is_ok());
}

#[tokio::test]
async fn test_coordinator_migrates_a_real_store() {
    let store = fruit_store();
    let coordinator = MigrationCoordinator::new(
        Arc::clone(&store),
        fruit_migrations(),
        VersioningConfig::new("3"),
    );

    coordinator.migrate(&CancellationToken::new()).await.unwrap();

    assert_eq!(coordinator.target(), &VersionKey::from("3"));
    assert_eq!(read(store.as_ref(), "/3/apples"), Some(56));
    assert!(coordinator.ready_error().is_ok());
}

#[tokio::test]
async fn test_abort_cancels_the_chain() {
    let store = fruit_store();
    let coordinator = MigrationCoordinator::new(
        Arc::clone(&store),
        fruit_migrations(),
        VersioningConfig::new("3"),
    );
    coordinator.abort();

    let err = coordinator
        .migrate(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(matches!(err, VersioningError::MigrationFailed(_)));
    assert_eq!(read(store.as_ref(), "/1/apples"), Some(7));
}

#[test]
fn test_migrate_outside_a_runtime_starts_nothing() {
    let store = fruit_store();
    let coordinator = MigrationCoordinator::new(
        Arc::clone(&store),
        fruit_migrations(),
        VersioningConfig::new("3"),
    );
    let cancel = CancellationToken::new();

    let mut context = Context::from_waker(Waker::noop());
    let mut early = pin!(coordinator.migrate(&cancel));
    match early.as_mut().poll(&mut context) {
        Poll::Ready(Err(VersioningError::NoRuntime)) => {}
        Poll::Ready(Err(other)) => panic!("expected NoRuntime, got {other}"),
        Poll::Ready(Ok(())) => panic!("expected NoRuntime, got a finished run"),
        Poll::Pending => panic!("expected NoRuntime, the run was started"),
    }
    assert!(!coordinator.is_finished());
    assert_eq!(read(store.as_ref(), "/1/apples"), Some(7));

    // The failed attempt leaves the coordinator usable.
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(coordinator.migrate(&cancel)).unwrap();
    assert_eq!(read(store.as_ref(), "/3/apples"), Some(56));
}

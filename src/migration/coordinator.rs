//! Runs a migration chain once, for however many callers ask.
//!
//! The first call to [`MigrationCoordinator::migrate`] starts the chain on a
//! blocking worker. Every caller, the first included, then waits for the
//! run's outcome on a shared watch channel. A caller that gives up through
//! its own cancellation token stops waiting; the run itself keeps going and
//! its outcome is what later callers and [`MigrationState::ready_error`]
//! observe.

use std::sync::{Arc, Once};
use std::time::Instant;

use log::{error, info};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::VersioningConfig;
use crate::error::{VersioningError, VersioningResult};
use crate::traits::datastore::Datastore;
use crate::traits::state::MigrationState;
use crate::version::VersionKey;

use super::chain::migrate_to;
use super::versioned::VersionedMigrationList;

type RunFn = dyn Fn(
        &CancellationToken,
        &Arc<dyn Datastore>,
        &VersionedMigrationList,
        &VersioningConfig,
    ) -> VersioningResult<VersionKey>
    + Send
    + Sync;

type Outcome = Result<VersionKey, Arc<VersioningError>>;

pub struct MigrationCoordinator {
    store: Arc<dyn Datastore>,
    migrations: VersionedMigrationList,
    config: VersioningConfig,
    run: Arc<RunFn>,
    start: Once,
    done: Arc<watch::Sender<Option<Outcome>>>,
    run_token: CancellationToken,
}

impl MigrationCoordinator {
    pub fn new(
        store: Arc<dyn Datastore>,
        migrations: VersionedMigrationList,
        config: VersioningConfig,
    ) -> Self {
        Self::with_runner(store, migrations, config, migrate_to)
    }

    /// Coordinator around a custom chain runner instead of [`migrate_to`].
    pub fn with_runner<R>(
        store: Arc<dyn Datastore>,
        migrations: VersionedMigrationList,
        config: VersioningConfig,
        run: R,
    ) -> Self
    where
        R: Fn(
                &CancellationToken,
                &Arc<dyn Datastore>,
                &VersionedMigrationList,
                &VersioningConfig,
            ) -> VersioningResult<VersionKey>
            + Send
            + Sync
            + 'static,
    {
        let (done, _) = watch::channel(None);
        Self {
            store,
            migrations,
            config,
            run: Arc::new(run),
            start: Once::new(),
            done: Arc::new(done),
            run_token: CancellationToken::new(),
        }
    }

    pub fn target(&self) -> &VersionKey {
        &self.config.target
    }

    /// True once the run has finished, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.done.borrow().is_some()
    }

    /// Ask a running chain to stop at its next record boundary. Waiters then
    /// observe the run failing with [`VersioningError::Cancelled`].
    pub fn abort(&self) {
        self.run_token.cancel();
    }

    /// Run the migrations if no one has yet, then wait for them to finish.
    ///
    /// Must be called from within a tokio runtime, otherwise it fails with
    /// [`VersioningError::NoRuntime`] and nothing is started. Cancelling
    /// `cancel` only ends this caller's wait.
    pub async fn migrate(&self, cancel: &CancellationToken) -> VersioningResult<()> {
        let runtime = Handle::try_current().map_err(|_| VersioningError::NoRuntime)?;
        self.start.call_once(|| self.spawn_run(&runtime));

        let mut outcome = self.done.subscribe();
        let finished = tokio::select! {
            _ = cancel.cancelled() => return Err(VersioningError::Cancelled),
            finished = wait_for_outcome(&mut outcome) => finished,
        };

        match finished {
            Some(Ok(_)) => Ok(()),
            Some(Err(e)) => Err(VersioningError::MigrationFailed(e)),
            None => Err(VersioningError::MigrationsNotRun),
        }
    }

    fn spawn_run(&self, runtime: &Handle) {
        let store = Arc::clone(&self.store);
        let migrations = self.migrations.clone();
        let config = self.config.clone();
        let run = Arc::clone(&self.run);
        let token = self.run_token.clone();
        let done = Arc::clone(&self.done);

        info!(
            "migration_run.started target={:?} migrations={}",
            config.target.as_str(),
            migrations.len()
        );
        let start = Instant::now();
        let worker = runtime.spawn_blocking(move || run(&token, &store, &migrations, &config));

        runtime.spawn(async move {
            let outcome = match worker.await {
                Ok(result) => result.map_err(Arc::new),
                Err(e) => Err(Arc::new(VersioningError::Storage(format!(
                    "migration worker stopped: {e}"
                )))),
            };
            match &outcome {
                Ok(version) => info!(
                    "migration_run.finished version={:?} duration_ms={}",
                    version.as_str(),
                    start.elapsed().as_millis()
                ),
                Err(e) => error!(
                    "migration_run.failed error={} duration_ms={}",
                    e,
                    start.elapsed().as_millis()
                ),
            }
            done.send_replace(Some(outcome));
        });
    }
}

async fn wait_for_outcome(receiver: &mut watch::Receiver<Option<Outcome>>) -> Option<Outcome> {
    loop {
        let current = receiver.borrow_and_update().clone();
        if current.is_some() {
            return current;
        }
        if receiver.changed().await.is_err() {
            return None;
        }
    }
}

impl MigrationState for MigrationCoordinator {
    fn ready_error(&self) -> VersioningResult<()> {
        match &*self.done.borrow() {
            None => Err(VersioningError::MigrationsNotRun),
            Some(Ok(_)) => Ok(()),
            Some(Err(e)) => Err(VersioningError::MigrationFailed(Arc::clone(e))),
        }
    }
}

impl std::fmt::Debug for MigrationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationCoordinator")
            .field("target", &self.config.target)
            .field("migrations", &self.migrations.len())
            .field("finished", &self.is_finished())
            .finish()
    }
}

//! Walking a store along a chain of versioned migrations.
//!
//! [`migrate_to`] reads the version a store is at, then applies migrations
//! one at a time, up or down, until the configured target is reached. Each
//! step is matched by the version the store is currently at, not by its
//! position in the list. The version reached is written back to the store
//! whether or not the target was reached.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::VersioningConfig;
use crate::error::{ResultExt, VersioningError, VersioningResult};
use crate::key::Key;
use crate::query::Query;
use crate::traits::datastore::{Batch, Datastore};
use crate::version::VersionKey;

use super::MigrationDirection;
use super::execute::MigrationFailure;
use super::versioned::{VersionedMigration, VersionedMigrationList, keys_for_version};

/// The version recorded in `store`, or `None` when no version was ever
/// written. An empty record is the unversioned store, not an absent one.
pub fn current_version(
    store: &dyn Datastore,
    config: &VersioningConfig,
) -> VersioningResult<Option<VersionKey>> {
    let bytes = store.get(&config.version_key).context("reading version")?;
    Ok(bytes.map(|bytes| VersionKey::from_bytes(&bytes)))
}

/// Bring `store` to `config.target` and return the version it ends at.
///
/// The migration list must be contiguous once sorted by new version. A store
/// with no version record and no data is simply stamped with the target. A
/// store with data but no version record is unversioned, and only a list
/// whose first migration starts from the unversioned store can move it.
pub fn migrate_to(
    cancel: &CancellationToken,
    store: &Arc<dyn Datastore>,
    migrations: &VersionedMigrationList,
    config: &VersioningConfig,
) -> VersioningResult<VersionKey> {
    let target = &config.target;
    let mut migrations = migrations.clone();
    migrations.sort_ascending();
    if !migrations.is_contiguous() {
        return Err(VersioningError::NotContiguous);
    }

    let current = match current_version(store.as_ref(), config)? {
        Some(version) => version,
        None => {
            let has_data = has_data(store.as_ref()).context("determining if store has data")?;
            match migrations.first() {
                Some(first) if has_data => {
                    if !first.old_version().is_unversioned() {
                        return Err(VersioningError::Unversioned);
                    }
                    VersionKey::unversioned()
                }
                _ => {
                    write_version(store.as_ref(), config, target)?;
                    info!("migration_chain.initialized target={}", target);
                    return Ok(target.clone());
                }
            }
        }
    };

    let start = Instant::now();
    info!(
        "migration_chain.started current={:?} target={:?} migrations={}",
        current.as_str(),
        target.as_str(),
        migrations.len()
    );

    let mut chain = Chain {
        cancel,
        store,
        config,
        current,
    };
    let outcome = chain.run(&migrations, target);
    let reached = chain.current;
    let written = write_version(store.as_ref(), config, &reached);

    info!(
        "migration_chain.finished reached={:?} target={:?} ok={} duration_ms={}",
        reached.as_str(),
        target.as_str(),
        outcome.is_ok(),
        start.elapsed().as_millis()
    );

    match (outcome, written) {
        (Ok(()), Ok(())) => Ok(reached),
        (Ok(()), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(write)) => {
            warn!(
                "migration_chain.version_not_recorded reached={:?} error={}",
                reached.as_str(),
                write
            );
            Err(e)
        }
    }
}

struct Chain<'a> {
    cancel: &'a CancellationToken,
    store: &'a Arc<dyn Datastore>,
    config: &'a VersioningConfig,
    current: VersionKey,
}

impl Chain<'_> {
    fn run(&mut self, migrations: &VersionedMigrationList, target: &VersionKey) -> VersioningResult<()> {
        if *target > self.current {
            for migration in migrations.iter() {
                if *migration.old_version() != self.current {
                    continue;
                }
                self.step(migration, MigrationDirection::Up)?;
                if self.current == *target {
                    return Ok(());
                }
            }
        } else if *target < self.current {
            for migration in migrations.iter().rev() {
                if !migration.is_reversible() || *migration.new_version() != self.current {
                    continue;
                }
                self.step(migration, MigrationDirection::Down)?;
                if self.current == *target {
                    return Ok(());
                }
            }
        } else {
            return Ok(());
        }

        Err(VersioningError::TargetNotReached {
            target: target.clone(),
            reached: self.current.clone(),
        })
    }

    /// Apply one migration. On failure the records it wrote are removed and
    /// the current version stays where it was.
    fn step(
        &mut self,
        migration: &VersionedMigration,
        direction: MigrationDirection,
    ) -> VersioningResult<()> {
        let (from, to) = match direction {
            MigrationDirection::Up => (migration.old_version(), migration.new_version()),
            MigrationDirection::Down => (migration.new_version(), migration.old_version()),
        };
        let result = match direction {
            MigrationDirection::Up => {
                migration.up(self.cancel, self.store, &self.config.version_key)
            }
            MigrationDirection::Down => {
                migration.down(self.cancel, self.store, &self.config.version_key)
            }
        };

        let keys = match result {
            Ok(keys) => keys,
            Err(MigrationFailure { migrated, source }) => {
                let written = keys_for_version(to, &migrated);
                warn!(
                    "migration_step.rolled_back direction={} from={:?} to={:?} removed={} error={}",
                    direction,
                    from.as_str(),
                    to.as_str(),
                    written.len(),
                    source
                );
                if let Err(e) = delete_keys(self.store.as_ref(), &written) {
                    warn!("migration_step.rollback_failed error={}", e);
                }
                return Err(VersioningError::Step {
                    direction,
                    from: from.clone(),
                    to: to.clone(),
                    source: Box::new(source),
                });
            }
        };

        info!(
            "migration_step.applied direction={} from={:?} to={:?} records={}",
            direction,
            from.as_str(),
            to.as_str(),
            keys.len()
        );
        self.current = to.clone();
        write_version(self.store.as_ref(), self.config, &self.current)?;

        let stale = keys_for_version(from, &keys);
        delete_keys(self.store.as_ref(), &stale).context("deleting keys")?;
        debug!(
            "migration_step.cleaned version={:?} deleted={}",
            from.as_str(),
            stale.len()
        );
        Ok(())
    }
}

fn write_version(
    store: &dyn Datastore,
    config: &VersioningConfig,
    version: &VersionKey,
) -> VersioningResult<()> {
    store
        .put(&config.version_key, version.as_bytes())
        .context("writing version")
}

fn has_data(store: &dyn Datastore) -> VersioningResult<bool> {
    match store.query(&Query::all())?.next() {
        Some(Err(e)) => Err(e),
        Some(Ok(_)) => Ok(true),
        None => Ok(false),
    }
}

fn delete_keys(store: &dyn Datastore, keys: &[Key]) -> VersioningResult<()> {
    if keys.is_empty() {
        return Ok(());
    }
    let mut batch = store.batch().context("batch error")?;
    for key in keys {
        batch.delete(key.clone())?;
    }
    batch.commit().context("committing")
}

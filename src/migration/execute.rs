//! The per-record migration engine.
//!
//! [`execute`] streams every record a query selects from a source store and
//! writes its transformed form into a destination store through one batch.
//! Records that cannot be decoded, transformed or encoded, or that the
//! destination already holds, are skipped and reported together; the rest
//! are still written. Store failures stop the pass.

use std::time::Instant;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::error::{RecordError, RecordErrors, VersioningError, VersioningResult};
use crate::key::Key;
use crate::query::{Entry, Query};
use crate::traits::datastore::{Batch, Datastore};

use super::validate::RecordTransform;

/// A pass that did not fully succeed.
///
/// `migrated` lists the keys that were queued for the destination before the
/// pass stopped. They are written unless the failure was the commit itself,
/// in which case the list is empty.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct MigrationFailure {
    pub migrated: Vec<Key>,
    #[source]
    pub source: VersioningError,
}

impl MigrationFailure {
    fn new(migrated: Vec<Key>, source: VersioningError) -> Self {
        Self { migrated, source }
    }
}

impl From<MigrationFailure> for VersioningError {
    fn from(failure: MigrationFailure) -> Self {
        failure.source
    }
}

/// Carry every record `query` selects in `source` into `dest`.
///
/// Returns the keys written. When some records failed the error is
/// [`VersioningError::Records`] and `migrated` still lists the records that
/// made it.
///
/// `cancel` is checked before each record. Once it fires the records queued
/// so far are committed and the pass returns [`VersioningError::Cancelled`].
pub fn execute(
    cancel: &CancellationToken,
    query: &Query,
    source: &dyn Datastore,
    dest: &dyn Datastore,
    transform: &dyn RecordTransform,
) -> Result<Vec<Key>, MigrationFailure> {
    let start = Instant::now();
    let results = source
        .query(query)
        .map_err(|e| MigrationFailure::new(Vec::new(), e.context("querying source")))?;
    let mut batch = dest
        .batch()
        .map_err(|e| MigrationFailure::new(Vec::new(), e.context("batch error")))?;

    let (migrated, outcome) = run(cancel, results, dest, transform, &mut *batch);

    if let Err(e) = batch.commit() {
        return Err(MigrationFailure::new(Vec::new(), e.context("committing")));
    }

    debug!(
        "migration_pass.committed migrated={} signature=({}) duration_ms={}",
        migrated.len(),
        transform.signature(),
        start.elapsed().as_millis()
    );

    match outcome {
        Ok(()) => Ok(migrated),
        Err(e) => Err(MigrationFailure::new(migrated, e)),
    }
}

fn run<B: Batch + ?Sized>(
    cancel: &CancellationToken,
    results: impl Iterator<Item = VersioningResult<Entry>>,
    dest: &dyn Datastore,
    transform: &dyn RecordTransform,
    batch: &mut B,
) -> (Vec<Key>, VersioningResult<()>) {
    let mut migrated = Vec::new();
    let mut errors = RecordErrors::default();

    for result in results {
        if cancel.is_cancelled() {
            return (migrated, Err(VersioningError::Cancelled));
        }
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => return (migrated, Err(e.context("reading source record"))),
        };

        let output = match transform.apply(&entry.key, &entry.value) {
            Ok(output) => output,
            Err(e) => {
                warn!("migration_record.skipped error={}", e);
                errors.push(e);
                continue;
            }
        };

        match dest.has(&entry.key) {
            Ok(false) => {}
            Ok(true) => {
                let e = RecordError::AlreadyTracked { key: entry.key };
                warn!("migration_record.skipped error={}", e);
                errors.push(e);
                continue;
            }
            Err(e) => return (migrated, Err(e.context("checking destination"))),
        }

        let bytes = match (*output).encode_record() {
            Ok(bytes) => bytes,
            Err(source) => {
                let e = RecordError::Encode {
                    key: entry.key,
                    source,
                };
                warn!("migration_record.skipped error={}", e);
                errors.push(e);
                continue;
            }
        };

        if let Err(e) = batch.put(entry.key.clone(), bytes) {
            return (migrated, Err(e.context("writing record")));
        }
        migrated.push(entry.key);
    }

    (migrated, errors.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::databases::MemoryStore;
    use crate::migration::validate::TypedTransform;
    use crate::traits::codec::RecordEncode;

    fn add_one(value: i64) -> Result<i64, std::convert::Infallible> {
        Ok(value + 1)
    }

    #[test]
    fn cancelled_before_first_record_writes_nothing() {
        let source = MemoryStore::new();
        let dest = MemoryStore::new();
        source.put(&Key::new("/a"), &1i64.encode_record().unwrap()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let failure = execute(
            &cancel,
            &Query::all(),
            &source,
            &dest,
            &TypedTransform::new(add_one),
        )
        .unwrap_err();
        assert!(failure.source.is_cancelled());
        assert!(failure.migrated.is_empty());
        assert!(dest.is_empty().unwrap());
    }
}

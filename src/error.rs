use std::fmt::Display;
use std::sync::Arc;

use thiserror::Error;

use crate::key::Key;
use crate::migration::MigrationDirection;
use crate::version::VersionKey;

pub type VersioningResult<T> = Result<T, VersioningError>;

/// Error type returned by user supplied record transforms once erased.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum VersioningError {
    #[error(transparent)]
    Conversion(#[from] EncodingDecodingError),
    #[cfg(feature = "sled")]
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[cfg(feature = "redb")]
    #[error(transparent)]
    Redb(#[from] RedbError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(String),

    /// Per-record failures collected during one execution pass.
    #[error(transparent)]
    Records(#[from] RecordErrors),

    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: Box<VersioningError>,
    },

    #[error("reversible function does not have inverse types")]
    NotInverse,
    #[error("migration is not reversible")]
    NotReversible,
    #[error("{}", display_list(.0))]
    Build(Vec<VersioningError>),

    #[error("migrations list must be contiguous")]
    NotContiguous,
    #[error("cannot migrate from an unversioned database")]
    Unversioned,
    #[error("never reached target database version")]
    TargetNotReached { target: VersionKey, reached: VersionKey },
    #[error("running {direction} migration from '{from}' to '{to}': {source}")]
    Step {
        direction: MigrationDirection,
        from: VersionKey,
        to: VersionKey,
        #[source]
        source: Box<VersioningError>,
    },

    #[error("database migrations must be run or are still running")]
    MigrationsNotRun,
    #[error("context cancelled")]
    Cancelled,
    #[error("error migrating database: {0}")]
    MigrationFailed(#[source] Arc<VersioningError>),
    #[error("migrations must be started from within a tokio runtime")]
    NoRuntime,

    #[error("already tracking state for '{0}'")]
    AlreadyTracking(Key),
    #[error("no state tracked for '{0}'")]
    NotTracked(Key),
    #[error("mutating state for '{key}': {source}")]
    Mutation {
        key: Key,
        #[source]
        source: BoxError,
    },
}

impl VersioningError {
    /// Wrap this error with the stage it happened in.
    pub fn context(self, context: &'static str) -> Self {
        VersioningError::Context {
            context,
            source: Box::new(self),
        }
    }

    /// Walks through context wrappers to the error that actually happened.
    pub fn root(&self) -> &VersioningError {
        match self {
            VersioningError::Context { source, .. } => source.root(),
            VersioningError::Step { source, .. } => source.root(),
            VersioningError::MigrationFailed(inner) => inner.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), VersioningError::Cancelled)
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, VersioningError::MigrationsNotRun)
    }

    /// The per-record failures behind this error, if that is what it is.
    pub fn record_errors(&self) -> Option<&RecordErrors> {
        match self.root() {
            VersioningError::Records(errors) => Some(errors),
            _ => None,
        }
    }
}

pub(crate) trait ResultExt<T> {
    fn context(self, context: &'static str) -> VersioningResult<T>;
}

impl<T, E: Into<VersioningError>> ResultExt<T> for Result<T, E> {
    fn context(self, context: &'static str) -> VersioningResult<T> {
        self.map_err(|e| e.into().context(context))
    }
}

#[derive(Debug, Error)]
pub enum EncodingDecodingError {
    #[error("There was an error encoding type: {0}")]
    Encoding(#[from] bincode::error::EncodeError),
    #[error("There was an error decoding type: {0}")]
    Decoding(#[from] bincode::error::DecodeError),
}

/// A single record that could not be carried over to the new namespace.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("decoding state for key '{key}': {source}")]
    Decode {
        key: Key,
        #[source]
        source: bincode::error::DecodeError,
    },
    #[error("attempting to transform to new state '{key}': {source}")]
    Transform {
        key: Key,
        #[source]
        source: BoxError,
    },
    #[error("already tracking state in new db for '{key}'")]
    AlreadyTracked { key: Key },
    #[error("encoding state for key '{key}': {source}")]
    Encode {
        key: Key,
        #[source]
        source: bincode::error::EncodeError,
    },
}

impl RecordError {
    pub fn key(&self) -> &Key {
        match self {
            RecordError::Decode { key, .. }
            | RecordError::Transform { key, .. }
            | RecordError::AlreadyTracked { key }
            | RecordError::Encode { key, .. } => key,
        }
    }
}

/// Per-record errors in the order the records were read.
#[derive(Debug, Default, Error)]
#[error("{}", display_list(.0))]
pub struct RecordErrors(Vec<RecordError>);

impl RecordErrors {
    pub fn push(&mut self, error: RecordError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> VersioningResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(VersioningError::Records(self))
        }
    }
}

impl IntoIterator for RecordErrors {
    type Item = RecordError;
    type IntoIter = std::vec::IntoIter<RecordError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(feature = "redb")]
#[derive(Error, Debug)]
pub enum RedbError {
    #[error(transparent)]
    DatabaseError(#[from] redb::DatabaseError),
    #[error(transparent)]
    TransactionError(#[from] redb::TransactionError),
    #[error(transparent)]
    TableError(#[from] redb::TableError),
    #[error(transparent)]
    CommitError(#[from] redb::CommitError),
    #[error(transparent)]
    StorageError(#[from] redb::StorageError),
}

#[cfg(feature = "redb")]
macro_rules! impl_from_redb {
    ($($err:ty => $variant:ident),*) => {
        $(
            impl From<$err> for VersioningError {
                fn from(err: $err) -> Self {
                    VersioningError::Redb(RedbError::$variant(err))
                }
            }
        )*
    };
}

#[cfg(feature = "redb")]
impl_from_redb!(
    redb::DatabaseError => DatabaseError,
    redb::TransactionError => TransactionError,
    redb::TableError => TableError,
    redb::CommitError => CommitError,
    redb::StorageError => StorageError
);

fn display_list<E: Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_errors_join_in_order() {
        let mut errors = RecordErrors::default();
        errors.push(RecordError::AlreadyTracked {
            key: Key::new("/apples"),
        });
        errors.push(RecordError::AlreadyTracked {
            key: Key::new("/oranges"),
        });
        assert_eq!(
            errors.to_string(),
            "already tracking state in new db for '/apples'; already tracking state in new db for '/oranges'"
        );
    }

    #[test]
    fn root_walks_through_wrappers() {
        let err = VersioningError::MigrationFailed(Arc::new(
            VersioningError::Cancelled.context("running migrations"),
        ));
        assert!(err.is_cancelled());
        assert_eq!(
            err.to_string(),
            "error migrating database: running migrations: context cancelled"
        );
    }
}

//! Fluent construction of a single migration step.
//!
//! Errors are carried through the chain instead of being returned at each
//! call: once a call fails, the remaining calls leave the error alone and
//! [`MigrationBuilder::build`] returns it.
//!
//! ```
//! use netabase_versioning::migration::MigrationBuilder;
//! use netabase_versioning::error::VersioningError;
//!
//! fn to_text(count: i64) -> Result<String, std::convert::Infallible> {
//!     Ok(count.to_string())
//! }
//!
//! fn add_one(count: i64) -> Result<i64, std::convert::Infallible> {
//!     Ok(count + 1)
//! }
//!
//! let result = MigrationBuilder::new(to_text)
//!     .reversible(add_one)
//!     .exclude_keys(["/apples"])
//!     .build();
//! assert!(matches!(result, Err(VersioningError::NotInverse)));
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, VersioningError, VersioningResult};
use crate::key::Key;
use crate::query::{Filter, KeyOp, Query};
use crate::traits::codec::{RecordDecode, RecordEncode};
use crate::traits::datastore::Datastore;

use super::execute::{MigrationFailure, execute};
use super::validate::{RecordTransform, TypedTransform, check_inverse};

#[derive(Clone)]
struct Draft {
    up: Arc<dyn RecordTransform>,
    down: Option<Arc<dyn RecordTransform>>,
    filters: Vec<Filter>,
    only: Option<BTreeSet<Key>>,
}

pub struct MigrationBuilder {
    state: VersioningResult<Draft>,
}

impl MigrationBuilder {
    pub fn new<F, I, O, E>(up: F) -> Self
    where
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
        I: RecordDecode + 'static,
        O: RecordEncode + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            state: Ok(Draft {
                up: Arc::new(TypedTransform::new(up)),
                down: None,
                filters: Vec::new(),
                only: None,
            }),
        }
    }

    /// Attach the transform that undoes `up`. Its input type must be `up`'s
    /// output type and the other way round.
    pub fn reversible<F, I, O, E>(self, down: F) -> Self
    where
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
        I: RecordDecode + 'static,
        O: RecordEncode + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let state = self.state.and_then(|mut draft| {
            let down = TypedTransform::new(down);
            check_inverse(&draft.up.signature(), &down.signature())?;
            draft.down = Some(Arc::new(down));
            Ok(draft)
        });
        Self { state }
    }

    /// Leave these keys where they are.
    pub fn exclude_keys<K: Into<Key>>(self, keys: impl IntoIterator<Item = K>) -> Self {
        let state = self.state.map(|mut draft| {
            draft.filters.extend(keys.into_iter().map(|key| Filter::KeyCompare {
                key: key.into(),
                op: KeyOp::NotEqual,
            }));
            draft
        });
        Self { state }
    }

    /// Migrate only these keys. Repeated calls extend the same allow-list.
    pub fn only<K: Into<Key>>(self, keys: impl IntoIterator<Item = K>) -> Self {
        let state = self.state.map(|mut draft| {
            draft
                .only
                .get_or_insert_with(BTreeSet::new)
                .extend(keys.into_iter().map(Into::into));
            draft
        });
        Self { state }
    }

    pub fn build(self) -> VersioningResult<Migration> {
        let draft = self.state?;
        let mut query = Query::all();
        for filter in draft.filters {
            query = query.filter(filter);
        }
        if let Some(only) = draft.only {
            query = query.filter(Filter::KeyIn(only));
        }
        Ok(Migration {
            query,
            up: draft.up,
            down: draft.down,
        })
    }
}

impl std::fmt::Debug for MigrationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            Ok(draft) => f
                .debug_struct("MigrationBuilder")
                .field("up", &draft.up.signature())
                .field("reversible", &draft.down.is_some())
                .finish(),
            Err(e) => f.debug_tuple("MigrationBuilder").field(e).finish(),
        }
    }
}

/// A built migration step, not yet tied to any versions.
///
/// `up` reads from the old records and writes the new ones; `down` does the
/// reverse. Neither touches the store it reads from.
#[derive(Clone)]
pub struct Migration {
    query: Query,
    up: Arc<dyn RecordTransform>,
    down: Option<Arc<dyn RecordTransform>>,
}

impl Migration {
    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// A copy of this migration that also leaves `key` where it is.
    pub fn excluding(&self, key: impl Into<Key>) -> Migration {
        let mut migration = self.clone();
        migration.query = migration.query.filter(Filter::KeyCompare {
            key: key.into(),
            op: KeyOp::NotEqual,
        });
        migration
    }

    pub fn up(
        &self,
        cancel: &CancellationToken,
        old: &dyn Datastore,
        new: &dyn Datastore,
    ) -> Result<Vec<Key>, MigrationFailure> {
        execute(cancel, &self.query, old, new, self.up.as_ref())
    }

    pub fn down(
        &self,
        cancel: &CancellationToken,
        new: &dyn Datastore,
        old: &dyn Datastore,
    ) -> Result<Vec<Key>, MigrationFailure> {
        match &self.down {
            Some(down) => execute(cancel, &self.query, new, old, down.as_ref()),
            None => Err(MigrationFailure {
                migrated: Vec::new(),
                source: VersioningError::NotReversible,
            }),
        }
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("query", &self.query)
            .field("up", &self.up.signature())
            .field("down", &self.down.as_ref().map(|down| down.signature()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_one(value: i64) -> Result<i64, std::convert::Infallible> {
        Ok(value + 1)
    }

    fn sub_one(value: i64) -> Result<i64, std::convert::Infallible> {
        Ok(value - 1)
    }

    fn to_text(value: i64) -> Result<String, std::convert::Infallible> {
        Ok(value.to_string())
    }

    #[test]
    fn errors_survive_later_calls() {
        let result = MigrationBuilder::new(to_text)
            .reversible(add_one)
            .exclude_keys(["/apples"])
            .only(["/oranges"])
            .build();
        assert!(matches!(result, Err(VersioningError::NotInverse)));
    }

    #[test]
    fn key_filters_end_up_in_the_query() {
        let migration = MigrationBuilder::new(add_one)
            .reversible(sub_one)
            .exclude_keys(["/apples"])
            .only(["/oranges", "/pears"])
            .only(["/plums"])
            .build()
            .unwrap();
        assert!(migration.is_reversible());
        let query = migration.query();
        assert!(!query.matches(&Key::new("/apples")));
        assert!(query.matches(&Key::new("/plums")));
        assert!(!query.matches(&Key::new("/grapes")));
    }
}

//! Migrations bound to a pair of versions.
//!
//! A [`VersionedMigration`] reads the records under its old version's prefix
//! and writes them under its new version's prefix of the same store. The
//! keys it reports are relative to those prefixes; [`keys_for_version`]
//! turns them back into store keys for cleanup.

use std::borrow::Cow;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::databases::NamespacedStore;
use crate::error::{BoxError, VersioningError, VersioningResult};
use crate::key::Key;
use crate::traits::codec::{RecordDecode, RecordEncode};
use crate::traits::datastore::Datastore;
use crate::version::VersionKey;

use super::builder::{Migration, MigrationBuilder};
use super::execute::MigrationFailure;

/// Prefix every key with the namespace of `version`.
pub fn keys_for_version(version: &VersionKey, keys: &[Key]) -> Vec<Key> {
    let namespace = version.namespace();
    keys.iter().map(|key| namespace.child(key)).collect()
}

#[derive(Debug, Clone)]
pub struct VersionedMigration {
    migration: Migration,
    old_version: VersionKey,
    new_version: VersionKey,
}

impl VersionedMigration {
    pub fn new(
        migration: Migration,
        old_version: impl Into<VersionKey>,
        new_version: impl Into<VersionKey>,
    ) -> Self {
        Self {
            migration,
            old_version: old_version.into(),
            new_version: new_version.into(),
        }
    }

    /// The first migration of a store, out of unversioned records.
    pub fn initial(migration: Migration, new_version: impl Into<VersionKey>) -> Self {
        Self::new(migration, VersionKey::unversioned(), new_version)
    }

    pub fn old_version(&self) -> &VersionKey {
        &self.old_version
    }

    pub fn new_version(&self) -> &VersionKey {
        &self.new_version
    }

    pub fn is_reversible(&self) -> bool {
        self.migration.is_reversible()
    }

    /// Migrate the old version's records into the new version's namespace.
    /// Returned keys are relative to either namespace.
    ///
    /// `version_key` is the store key holding the version record. It is
    /// never read as a record, which matters when the old version is the
    /// unversioned store and its namespace is the root.
    pub fn up(
        &self,
        cancel: &CancellationToken,
        store: &Arc<dyn Datastore>,
        version_key: &Key,
    ) -> Result<Vec<Key>, MigrationFailure> {
        let old = NamespacedStore::new(Arc::clone(store), self.old_version.namespace());
        let new = NamespacedStore::new(Arc::clone(store), self.new_version.namespace());
        self.reading_from(&self.old_version, version_key)
            .up(cancel, &old, &new)
    }

    /// Migrate the new version's records back into the old version's
    /// namespace. Fails with [`VersioningError::NotReversible`] when the
    /// migration has no reverse transform.
    pub fn down(
        &self,
        cancel: &CancellationToken,
        store: &Arc<dyn Datastore>,
        version_key: &Key,
    ) -> Result<Vec<Key>, MigrationFailure> {
        let old = NamespacedStore::new(Arc::clone(store), self.old_version.namespace());
        let new = NamespacedStore::new(Arc::clone(store), self.new_version.namespace());
        self.reading_from(&self.new_version, version_key)
            .down(cancel, &new, &old)
    }

    /// The migration to run when `source` is read, with the version record
    /// left out if it sits inside that namespace.
    fn reading_from(&self, source: &VersionKey, version_key: &Key) -> Cow<'_, Migration> {
        match version_key.strip_prefix(&source.namespace()) {
            Some(relative) => Cow::Owned(self.migration.excluding(relative)),
            None => Cow::Borrowed(&self.migration),
        }
    }
}

/// An ordered list of versioned migrations.
#[derive(Debug, Clone, Default)]
pub struct VersionedMigrationList(Vec<VersionedMigration>);

impl VersionedMigrationList {
    pub fn new(migrations: Vec<VersionedMigration>) -> Self {
        Self(migrations)
    }

    pub fn push(&mut self, migration: VersionedMigration) {
        self.0.push(migration);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VersionedMigration> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&VersionedMigration> {
        self.0.first()
    }

    pub fn sort_ascending(&mut self) {
        self.0.sort_by(|a, b| a.new_version.cmp(&b.new_version));
    }

    /// True when each migration, in the list's current order, starts at the
    /// version the previous one ends at.
    pub fn is_contiguous(&self) -> bool {
        self.0
            .windows(2)
            .all(|pair| pair[0].new_version == pair[1].old_version)
    }
}

impl FromIterator<VersionedMigration> for VersionedMigrationList {
    fn from_iter<T: IntoIterator<Item = VersionedMigration>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for VersionedMigrationList {
    type Item = VersionedMigration;
    type IntoIter = std::vec::IntoIter<VersionedMigration>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a VersionedMigrationList {
    type Item = &'a VersionedMigration;
    type IntoIter = std::slice::Iter<'a, VersionedMigration>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// [`MigrationBuilder`] with the versions attached.
///
/// The old version defaults to the unversioned store.
#[derive(Debug)]
pub struct VersionedBuilder {
    base: MigrationBuilder,
    old_version: VersionKey,
    new_version: VersionKey,
}

impl VersionedBuilder {
    pub fn new<F, I, O, E>(up: F, new_version: impl Into<VersionKey>) -> Self
    where
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
        I: RecordDecode + 'static,
        O: RecordEncode + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            base: MigrationBuilder::new(up),
            old_version: VersionKey::unversioned(),
            new_version: new_version.into(),
        }
    }

    pub fn reversible<F, I, O, E>(self, down: F) -> Self
    where
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
        I: RecordDecode + 'static,
        O: RecordEncode + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            base: self.base.reversible(down),
            ..self
        }
    }

    pub fn exclude_keys<K: Into<Key>>(self, keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            base: self.base.exclude_keys(keys),
            ..self
        }
    }

    pub fn only<K: Into<Key>>(self, keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            base: self.base.only(keys),
            ..self
        }
    }

    pub fn old_version(self, old_version: impl Into<VersionKey>) -> Self {
        Self {
            old_version: old_version.into(),
            ..self
        }
    }

    pub fn build(self) -> VersioningResult<VersionedMigration> {
        let migration = self.base.build()?;
        Ok(VersionedMigration::new(
            migration,
            self.old_version,
            self.new_version,
        ))
    }
}

/// Builds a whole migration list at once.
#[derive(Debug, Default)]
pub struct VersionedBuilderList(Vec<VersionedBuilder>);

impl VersionedBuilderList {
    pub fn new(builders: Vec<VersionedBuilder>) -> Self {
        Self(builders)
    }

    pub fn push(&mut self, builder: VersionedBuilder) {
        self.0.push(builder);
    }

    /// Every builder is built even after one fails, and all failures are
    /// reported together.
    pub fn build(self) -> VersioningResult<VersionedMigrationList> {
        let mut migrations = VersionedMigrationList::default();
        let mut errors = Vec::new();
        for builder in self.0 {
            match builder.build() {
                Ok(migration) => migrations.push(migration),
                Err(e) => errors.push(e),
            }
        }
        match errors.len() {
            0 => Ok(migrations),
            1 => Err(errors.remove(0)),
            _ => Err(VersioningError::Build(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn same(value: i64) -> Result<i64, std::convert::Infallible> {
        Ok(value)
    }

    fn to_text(value: i64) -> Result<String, std::convert::Infallible> {
        Ok(value.to_string())
    }

    fn migration(old: &str, new: &str) -> VersionedMigration {
        VersionedBuilder::new(same, new).old_version(old).build().unwrap()
    }

    #[test]
    fn prefixes_keys_with_version_namespace() {
        let keys = keys_for_version(&VersionKey::from("2"), &[Key::new("/apples")]);
        assert_eq!(keys, vec![Key::new("/2/apples")]);
        let keys = keys_for_version(&VersionKey::unversioned(), &[Key::new("/apples")]);
        assert_eq!(keys, vec![Key::new("/apples")]);
    }

    #[test]
    fn contiguity_follows_sorted_order() {
        let mut list = VersionedMigrationList::new(vec![
            migration("2", "3"),
            migration("", "1"),
            migration("1", "2"),
        ]);
        assert!(!list.is_contiguous());
        list.sort_ascending();
        assert!(list.is_contiguous());

        let mut gap = VersionedMigrationList::new(vec![migration("", "1"), migration("2", "3")]);
        gap.sort_ascending();
        assert!(!gap.is_contiguous());
    }

    #[test]
    fn unversioned_source_skips_the_version_record() {
        let store: Arc<dyn Datastore> = Arc::new(crate::databases::MemoryStore::new());
        let version_key = Key::new(crate::config::DEFAULT_VERSION_KEY);
        store.put(&version_key, b"").unwrap();
        store
            .put(&Key::new("/apples"), &7i64.encode_record().unwrap())
            .unwrap();

        let migrated = migration("", "1")
            .up(&CancellationToken::new(), &store, &version_key)
            .unwrap();

        assert_eq!(migrated, vec![Key::new("/apples")]);
        assert!(!store.has(&Key::new("/1/versions/current")).unwrap());
    }

    #[test]
    fn versioned_source_reads_its_whole_namespace() {
        let migration = migration("1", "2");
        let version_key = Key::new(crate::config::DEFAULT_VERSION_KEY);
        assert!(matches!(
            migration.reading_from(migration.old_version(), &version_key),
            Cow::Borrowed(_)
        ));
        assert!(matches!(
            migration.reading_from(&VersionKey::unversioned(), &version_key),
            Cow::Owned(_)
        ));
    }

    #[test]
    fn builder_list_collects_every_error() {
        let result = VersionedBuilderList::new(vec![
            VersionedBuilder::new(to_text, "1").reversible(same),
            VersionedBuilder::new(same, "2").old_version("1"),
            VersionedBuilder::new(to_text, "3").old_version("2").reversible(same),
        ])
        .build();
        match result {
            Err(VersioningError::Build(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected aggregated errors, got {other:?}"),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::key::Key;

/// Identifier for one schema generation of a store.
///
/// Versions are compared as plain strings, so `"10"` sorts before `"2"`.
/// Pick version names whose lexicographic order is the order they were
/// released in (`"v01"`, `"v02"`, ... or dates).
///
/// The empty version is the unversioned store that existed before any
/// migration was registered.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
)]
pub struct VersionKey(String);

impl VersionKey {
    pub fn new(version: impl Into<String>) -> Self {
        VersionKey(version.into())
    }

    pub fn unversioned() -> Self {
        VersionKey(String::new())
    }

    pub fn is_unversioned(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The namespace records of this version live under. The unversioned
    /// store uses the root namespace.
    pub fn namespace(&self) -> Key {
        Key::new(&self.0)
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        VersionKey(String::from_utf8_lossy(bytes).into_owned())
    }
}

impl From<&str> for VersionKey {
    fn from(version: &str) -> Self {
        VersionKey(version.to_string())
    }
}

impl PartialEq<&str> for VersionKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<str> for VersionKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

//! Hierarchical datastore keys.
//!
//! A [`Key`] is a slash separated path such as `/1/apples`. Keys are always
//! stored in their cleaned form: a single leading slash, no trailing slash and
//! no empty segments. The root key is `/`, and both `""` and `"/"` parse to it.
//!
//! Namespacing a store is nothing more than rewriting `/k` as `/<prefix>/k`,
//! which is what [`Key::child`] and [`Key::strip_prefix`] are for.

use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(from = "String", into = "String")]
pub struct Key(String);

impl Key {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let segments: Vec<&str> = raw
            .as_ref()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        Key(format!("/{}", segments.join("/")))
    }

    pub fn root() -> Self {
        Key("/".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Appends `child` below this key: `/1` + `/apples` is `/1/apples`.
    pub fn child(&self, child: &Key) -> Key {
        if self.is_root() {
            child.clone()
        } else if child.is_root() {
            self.clone()
        } else {
            Key(format!("{}{}", self.0, child.0))
        }
    }

    /// Path-wise ancestry: `/1` is an ancestor of `/1/apples` but not of
    /// `/10/apples` or of itself.
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other
            .0
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// `self` or anything below it.
    pub fn contains(&self, other: &Key) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    /// Removes `prefix` from the front of this key. Returns `None` when
    /// `prefix` is not an ancestor of (or equal to) this key.
    pub fn strip_prefix(&self, prefix: &Key) -> Option<Key> {
        if prefix.is_root() {
            return Some(self.clone());
        }
        if self == prefix {
            return Some(Key::root());
        }
        if prefix.is_ancestor_of(self) {
            return Some(Key(self.0[prefix.0.len()..].to_string()));
        }
        None
    }

    pub fn namespaces(&self) -> Vec<&str> {
        self.0.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Last path segment, empty for the root.
    pub fn name(&self) -> &str {
        self.namespaces().last().copied().unwrap_or("")
    }

    pub fn from_bytes(bytes: &[u8]) -> Key {
        Key::new(String::from_utf8_lossy(bytes))
    }
}

impl From<String> for Key {
    fn from(raw: String) -> Self {
        Key::new(raw)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Key::new(raw)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_raw_paths() {
        assert_eq!(Key::new("apples").as_str(), "/apples");
        assert_eq!(Key::new("/1//apples/").as_str(), "/1/apples");
        assert_eq!(Key::new("").as_str(), "/");
        assert_eq!(Key::new("/").as_str(), "/");
    }

    #[test]
    fn child_and_strip_are_inverse() {
        let prefix = Key::new("/1");
        let key = Key::new("/apples");
        let full = prefix.child(&key);
        assert_eq!(full.as_str(), "/1/apples");
        assert_eq!(full.strip_prefix(&prefix), Some(key.clone()));
        assert_eq!(Key::root().child(&key), key);
    }

    #[test]
    fn ancestry_is_path_wise() {
        let one = Key::new("/1");
        assert!(one.is_ancestor_of(&Key::new("/1/apples")));
        assert!(!one.is_ancestor_of(&Key::new("/10/apples")));
        assert!(!one.is_ancestor_of(&one));
        assert!(Key::root().is_ancestor_of(&one));
        assert_eq!(Key::new("/10/apples").strip_prefix(&one), None);
    }

    #[test]
    fn name_is_last_segment() {
        assert_eq!(Key::new("/versions/current").name(), "current");
        assert_eq!(Key::root().name(), "");
    }
}

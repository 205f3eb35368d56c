//! Range queries over a datastore.
//!
//! A [`Query`] selects every entry at or below `prefix` whose key passes all
//! of the `filters`. Backends only need to produce the prefix range in key
//! order; filter evaluation is shared through [`Query::matches`].

use std::collections::BTreeSet;

use crate::error::VersioningResult;
use crate::key::Key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Vec<u8>,
}

/// Streamed query output. Store errors surface as `Err` items and end the
/// useful part of the stream.
pub type QueryResults<'a> = Box<dyn Iterator<Item = VersioningResult<Entry>> + Send + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum KeyOp {
    #[strum(to_string = "==")]
    Equal,
    #[strum(to_string = "!=")]
    NotEqual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    KeyCompare { key: Key, op: KeyOp },
    KeyIn(BTreeSet<Key>),
}

impl Filter {
    pub fn matches(&self, key: &Key) -> bool {
        match self {
            Filter::KeyCompare { key: other, op } => match op {
                KeyOp::Equal => key == other,
                KeyOp::NotEqual => key != other,
            },
            Filter::KeyIn(keys) => keys.contains(key),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub prefix: Key,
    pub filters: Vec<Filter>,
}

impl Query {
    pub fn all() -> Self {
        Query::default()
    }

    pub fn with_prefix(prefix: impl Into<Key>) -> Self {
        Query {
            prefix: prefix.into(),
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// True when `key` falls under the prefix and passes every filter.
    pub fn matches(&self, key: &Key) -> bool {
        self.in_range(key) && self.filters.iter().all(|filter| filter.matches(key))
    }

    pub fn in_range(&self, key: &Key) -> bool {
        self.prefix.contains(key)
    }
}

//! Configuration for the file-backed stores and for versioned stores.
//!
//! Both use the builder pattern via `typed-builder`.

use std::path::PathBuf;

use typed_builder::TypedBuilder;

use crate::key::Key;
use crate::version::VersionKey;

/// Key the current version record is kept under unless configured otherwise.
pub const DEFAULT_VERSION_KEY: &str = "/versions/current";

/// Configuration for file-based database backends (Sled, Redb).
///
/// # Examples
///
/// ```
/// use netabase_versioning::config::FileConfig;
///
/// let config = FileConfig::builder()
///     .path("/data/store.db")
///     .cache_size_mb(512)
///     .build();
/// assert!(config.create_if_missing);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct FileConfig {
    /// Path to the database file or directory
    #[builder(setter(into))]
    pub path: PathBuf,

    /// Cache size in megabytes (backend-specific interpretation)
    #[builder(default = 256)]
    pub cache_size_mb: usize,

    /// Whether to create the database if it doesn't exist
    #[builder(default = true)]
    pub create_if_missing: bool,

    /// Whether to truncate/recreate if database already exists
    #[builder(default = false)]
    pub truncate: bool,

    /// Remove the database when the store is dropped (sled only)
    #[builder(default = false)]
    pub temporary: bool,

    /// Flush to disk after every committed batch
    #[builder(default = true)]
    pub use_fsync: bool,
}

impl FileConfig {
    /// Create a basic configuration with just a path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cache_size_mb: 256,
            create_if_missing: true,
            truncate: false,
            temporary: false,
            use_fsync: true,
        }
    }

    /// Create configuration for a temporary database
    pub fn temp() -> Self {
        let temp_path =
            std::env::temp_dir().join(format!("netabase_versioning_{}", uuid::Uuid::new_v4()));
        Self {
            temporary: true,
            use_fsync: false,
            ..Self::new(temp_path)
        }
    }
}

/// Where a versioned store is headed and where it records how far it got.
///
/// ```
/// use netabase_versioning::config::VersioningConfig;
///
/// let config = VersioningConfig::builder().target("3").build();
/// assert_eq!(config.version_key.as_str(), "/versions/current");
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct VersioningConfig {
    /// Version the store must reach before it is handed out
    #[builder(setter(into))]
    pub target: VersionKey,

    /// Key of the current version record
    #[builder(default = Key::new(DEFAULT_VERSION_KEY), setter(into))]
    pub version_key: Key,
}

impl VersioningConfig {
    pub fn new(target: impl Into<VersionKey>) -> Self {
        Self {
            target: target.into(),
            version_key: Key::new(DEFAULT_VERSION_KEY),
        }
    }
}

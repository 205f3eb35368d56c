use crate::error::VersioningResult;

/// Reports whether the store behind a gated façade may be used yet.
///
/// `Ok(())` once migrations finished successfully. Until then the error is
/// [`VersioningError::MigrationsNotRun`](crate::error::VersioningError::MigrationsNotRun);
/// after a failed run it is the stored failure.
pub trait MigrationState: Send + Sync {
    fn ready_error(&self) -> VersioningResult<()>;
}

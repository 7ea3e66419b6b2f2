use thiserror::Error;

use crate::core::CoreError;

/// Crate-level convenience error.
///
/// Thin wrapper over the capability errors. Only construction-time
/// operations return it; ingestion and write paths log and continue
/// instead, so a single bad artifact never blocks convergence.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

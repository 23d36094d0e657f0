//! Bulk generation of independent random keypairs.

use rayon::prelude::*;
use tracing::debug;

use crate::crypto::Keypair;
use crate::error::KeygenError;

/// Generates `count` independent keypairs.
///
/// Keys are produced in parallel on the rayon pool but returned in index
/// order. `count < 1` is rejected with [`KeygenError::InvalidArgument`]; there
/// is no upper bound beyond available memory. An entropy failure on any key
/// aborts the whole batch.
pub fn generate_batch(count: i64) -> Result<Vec<Keypair>, KeygenError> {
    if count < 1 {
        return Err(KeygenError::InvalidArgument(format!(
            "batch count must be at least 1, got {}",
            count
        )));
    }
    let count = usize::try_from(count).map_err(|_| {
        KeygenError::InvalidArgument(format!("batch count {} does not fit in memory", count))
    })?;

    debug!(count, "generating keypair batch");

    (0..count)
        .into_par_iter()
        .map(|_| Keypair::generate())
        .collect()
}

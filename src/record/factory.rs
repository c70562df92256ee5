//! Record construction with a shared, injectable random source.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::{DownloadRecord, RecordError, RecordSnapshot};

/// Builds [`DownloadRecord`]s, drawing each record's jitter from one RNG.
///
/// Use [`RecordFactory::seeded`] in tests for reproducible jitter.
pub struct RecordFactory {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl RecordFactory {
    /// Factory seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Factory with a deterministic seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Builds one record from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns the [`RecordError`] from [`DownloadRecord::from_snapshot`].
    pub fn build(&self, snapshot: &RecordSnapshot) -> Result<DownloadRecord, RecordError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        DownloadRecord::from_snapshot(snapshot, rng.as_mut())
    }
}

impl Default for RecordFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordFactory").finish_non_exhaustive()
    }
}

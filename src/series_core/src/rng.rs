use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::constants::TRIAL_CHUNK_SIZE;

/// Streams with the top bit set are reserved for deriving child sources.
const DERIVE_STREAM_BIT: u64 = 1 << 63;

/// Explicit source of randomness for one simulation run.
///
/// A source never hands out a shared generator. Workers ask for a numbered
/// ChaCha8 stream instead, so a run is reproducible from its seed no matter
/// how the trials are spread across threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomSource {
    seed: u64,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        RandomSource { seed }
    }

    /// Seeded source when a seed is given, otherwise one seeded from OS entropy.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => RandomSource::new(s),
            None => RandomSource::new(ChaCha8Rng::from_entropy().gen::<u64>()),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent generator for stream `id`.
    pub fn stream(&self, id: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(id & !DERIVE_STREAM_BIT);
        rng
    }

    /// Child source for a sub-task identified by `key`.
    pub fn derive(&self, key: u64) -> RandomSource {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(DERIVE_STREAM_BIT | key);
        RandomSource::new(rng.gen::<u64>())
    }
}

/// Split `trials` into `(stream id, trial count)` chunks of fixed size.
pub(crate) fn trial_chunks(trials: usize) -> Vec<(u64, usize)> {
    let mut chunks = Vec::with_capacity(trials.div_ceil(TRIAL_CHUNK_SIZE));
    let mut remaining = trials;
    let mut id = 0u64;
    while remaining > 0 {
        let len = remaining.min(TRIAL_CHUNK_SIZE);
        chunks.push((id, len));
        remaining -= len;
        id += 1;
    }
    chunks
}

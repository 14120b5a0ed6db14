use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random source owned by a single decision maker.
pub type PolicyRng = ChaCha8Rng;

/// Hands out independent, reproducible random streams keyed by name.
///
/// A stream's seed depends only on the master seed and the stream name, so
/// the order in which entities are constructed does not change their draws.
pub struct RngManager {
    seed: u64,
    issued: BTreeMap<String, u64>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            issued: BTreeMap::new(),
        }
    }

    /// Returns a fresh generator for `name`. Asking twice for the same name
    /// yields the next sub-stream instead of replaying the first one.
    pub fn stream(&mut self, name: &str) -> PolicyRng {
        let counter = self.issued.entry(name.to_string()).or_insert(0);
        let derived = derive_seed(self.seed, name, *counter);
        *counter += 1;
        ChaCha8Rng::seed_from_u64(derived)
    }
}

impl Default for RngManager {
    fn default() -> Self {
        Self::new(42)
    }
}

fn derive_seed(master: u64, name: &str, counter: u64) -> u64 {
    // FNV-1a over the name, then LCG mixing with the master seed.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let mut seed = master;
    seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed ^= hash;
    seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed ^= counter.wrapping_mul(69069);
    seed
}

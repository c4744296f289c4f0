//! Seedable random source owned by a connection.
//!
//! When a seed is provided via [`Config::rng_seed`](crate::Config::rng_seed),
//! randoms, session ids and signature nonces are reproducible, which keeps
//! replayed traffic byte-exact.

use rand::distributions::{Distribution, Standard};
use rand::rngs::StdRng;
use rand::{CryptoRng, Rng, RngCore, SeedableRng};

/// A random number generator that can be seeded for deterministic behavior.
///
/// Without a seed the generator is initialised from OS entropy.
pub struct SeededRng {
    inner: StdRng,
    seeded: bool,
}

impl SeededRng {
    /// Create a new RNG with an optional seed.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self {
                inner: StdRng::seed_from_u64(seed),
                seeded: true,
            },
            None => Self {
                inner: StdRng::from_entropy(),
                seeded: false,
            },
        }
    }

    /// Generate a random value of type T.
    pub fn random<T>(&mut self) -> T
    where
        Standard: Distribution<T>,
    {
        self.inner.gen()
    }

    /// `len` random bytes.
    pub fn random_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut out = vec![0; len];
        self.inner.fill_bytes(&mut out);
        out
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

impl CryptoRng for SeededRng {}

impl std::fmt::Debug for SeededRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededRng")
            .field("seeded", &self.seeded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_deterministic() {
        let mut rng1 = SeededRng::new(Some(12345));
        let mut rng2 = SeededRng::new(Some(12345));

        let values1: [u8; 4] = [rng1.random(), rng1.random(), rng1.random(), rng1.random()];
        let values2: [u8; 4] = [rng2.random(), rng2.random(), rng2.random(), rng2.random()];
        assert_eq!(values1, values2, "Same seed should produce same values");

        assert_eq!(rng1.random_bytes(32), rng2.random_bytes(32));
    }

    #[test]
    fn different_seeds_produce_different_values() {
        let mut rng1 = SeededRng::new(Some(12345));
        let mut rng2 = SeededRng::new(Some(54321));

        let value1: u64 = rng1.random();
        let value2: u64 = rng2.random();

        assert_ne!(
            value1, value2,
            "Different seeds should produce different values"
        );
    }
}

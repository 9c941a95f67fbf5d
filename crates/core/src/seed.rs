//! Reproducibility seeds.
//!
//! `resolve_seed` is the only place in the pipeline that touches ambient
//! randomness, and only when the caller did not supply a seed. Every later
//! stage that needs a "random" choice draws it from a `SeedStream` keyed on
//! the resolved seed, so the same seed always yields the same prompt.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated seeds.
pub const SEED_LENGTH: usize = 8;

/// Echo a caller-supplied seed verbatim, or generate a fresh one.
///
/// Empty and whitespace-only seeds count as omitted.
pub fn resolve_seed(requested: Option<&str>) -> String {
    match requested {
        Some(seed) if !seed.trim().is_empty() => seed.to_owned(),
        _ => generate_seed(),
    }
}

fn generate_seed() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SEED_LENGTH)
        .map(char::from)
        .collect()
}

/// Deterministic pseudo-random stream derived from a seed and a
/// discriminator.
///
/// Block `n` of the stream is `SHA-256(seed ‖ 0x00 ‖ discriminator ‖ 0x00 ‖
/// n as u64 big-endian)`; `next_u64` returns the first eight bytes of each
/// block. Distinct discriminators give independent streams for the same seed.
#[derive(Debug, Clone)]
pub struct SeedStream {
    seed: String,
    discriminator: String,
    counter: u64,
}

impl SeedStream {
    pub fn new(seed: &str, discriminator: &str) -> Self {
        SeedStream {
            seed: seed.to_owned(),
            discriminator: discriminator.to_owned(),
            counter: 0,
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.discriminator.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.counter.to_be_bytes());
        self.counter += 1;

        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }

    /// Uniform-ish index in `0..len`, `None` when `len == 0`.
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some((self.next_u64() % len as u64) as usize)
    }
}

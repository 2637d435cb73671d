//! Random streams.
//!
//! The composer owns one master generator. Every pass that may run in
//! parallel draws a single stream seed from it and derives one generator per
//! individual or per variable, so a run depends only on the master seed and
//! never on the thread schedule.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Generator used throughout the estimation.
pub type McRng = Xoshiro256PlusPlus;

const STREAM_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

/// Master generator, seeded explicitly or from the thread-local generator.
pub fn master(seed: Option<u64>) -> McRng {
    match seed {
        Some(seed) => McRng::seed_from_u64(seed),
        None => McRng::from_rng(&mut rand::rng()),
    }
}

/// Generator for sub-stream `index` of a pass seeded with `seed`.
pub fn stream(seed: u64, index: usize) -> McRng {
    McRng::seed_from_u64(seed.wrapping_add((index as u64 + 1).wrapping_mul(STREAM_MULTIPLIER)))
}

/// Draw the seed of the next pass from the master generator.
pub fn next_pass_seed(master: &mut McRng) -> u64 {
    master.random::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_reproducible_and_distinct() {
        let a: u64 = stream(42, 3).random();
        let b: u64 = stream(42, 3).random();
        let c: u64 = stream(42, 4).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn seeded_master_is_deterministic() {
        let mut m1 = master(Some(9));
        let mut m2 = master(Some(9));
        assert_eq!(next_pass_seed(&mut m1), next_pass_seed(&mut m2));
    }
}

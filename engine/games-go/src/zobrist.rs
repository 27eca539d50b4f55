//! Zobrist hash tables.
//!
//! Tables are generated once from a fixed seed so hashes are stable across
//! runs; superko detection and the evaluator cache both rely on that.

use once_cell::sync::Lazy;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::board::NUM_VERTICES;

/// Seed for the table generator. Changing it invalidates nothing at runtime
/// but breaks hash stability across builds, so leave it alone.
const ZOBRIST_SEED: u64 = 0x1c0ffee_d00d;

pub struct Zobrist {
    /// One table per stone color, indexed by vertex.
    pub stones: [[u64; NUM_VERTICES]; 2],
    /// Ko-point marker, indexed by vertex.
    pub ko: [u64; NUM_VERTICES],
    /// Consecutive-pass count (0, 1, >=2).
    pub passes: [u64; 3],
    pub black_to_move: u64,
}

pub static ZOBRIST: Lazy<Zobrist> = Lazy::new(|| {
    let mut rng = ChaCha20Rng::seed_from_u64(ZOBRIST_SEED);
    let mut stones = [[0u64; NUM_VERTICES]; 2];
    for table in stones.iter_mut() {
        for entry in table.iter_mut() {
            *entry = rng.gen();
        }
    }
    let mut ko = [0u64; NUM_VERTICES];
    for entry in ko.iter_mut() {
        *entry = rng.gen();
    }
    Zobrist {
        stones,
        ko,
        passes: [rng.gen(), rng.gen(), rng.gen()],
        black_to_move: rng.gen(),
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_stable() {
        // Two lookups observe the same lazily-built table.
        assert_eq!(ZOBRIST.stones[0][16], ZOBRIST.stones[0][16]);
        assert_ne!(ZOBRIST.stones[0][16], ZOBRIST.stones[1][16]);
        assert_ne!(ZOBRIST.black_to_move, 0);
    }

    #[test]
    fn no_trivial_collisions_between_colors() {
        for v in 0..NUM_VERTICES {
            assert_ne!(ZOBRIST.stones[0][v], ZOBRIST.stones[1][v]);
        }
    }
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Deterministic integer mixing.
//!
//! Everything that turns pixel data into keys goes through these functions,
//! so they must produce identical output on every target (native 64-bit,
//! WASM 32-bit). Only wrapping integer arithmetic and shifts are used; no
//! `usize`, no floating point.
//!
//! Constants are the SplitMix64 increment and finalizer multipliers
//! (Steele, Lea & Flood, "Fast splittable pseudorandom number generators").

/// SplitMix64 stream increment (the 64-bit golden ratio).
pub const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

const MIX_M1: u64 = 0xBF58_476D_1CE4_E5B9;
const MIX_M2: u64 = 0x94D0_49BB_1331_11EB;

/// SplitMix64 finalizer: a bijective 64-bit avalanche.
///
/// Every input bit affects every output bit with probability close to 1/2,
/// and distinct inputs always give distinct outputs.
#[inline]
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(MIX_M1);
    z = (z ^ (z >> 27)).wrapping_mul(MIX_M2);
    z ^ (z >> 31)
}

/// Pack a sample's coordinates and value into disjoint bit fields.
///
/// Layout (LSB → MSB): value (8 bits), channel (8 bits), x (24 bits),
/// y (24 bits). Dimensions are capped well below 2^24 elsewhere, so distinct
/// `(x, y, channel, value)` tuples never collide.
#[inline]
pub fn pack_sample(x: u32, y: u32, channel: u8, value: u8) -> u64 {
    (value as u64)
        | ((channel as u64) << 8)
        | (((x as u64) & 0xFF_FFFF) << 16)
        | (((y as u64) & 0xFF_FFFF) << 40)
}

/// Expand a 64-bit key into a 32-byte PRNG seed with a SplitMix64 stream.
pub fn expand_seed(key: u64) -> [u8; 32] {
    let mut seed = [0u8; 32];
    let mut state = key;
    for chunk in seed.chunks_exact_mut(8) {
        state = state.wrapping_add(GOLDEN_GAMMA);
        chunk.copy_from_slice(&mix64(state).to_le_bytes());
    }
    seed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix64_known_values() {
        // First outputs of SplitMix64 seeded with 0 (reference implementation).
        assert_eq!(mix64(GOLDEN_GAMMA), 0xE220_A839_7B1D_CDAF);
        assert_eq!(mix64(GOLDEN_GAMMA.wrapping_mul(2)), 0x6E78_9E6A_A1B9_65F4);
    }

    #[test]
    fn mix64_zero_is_fixed_point() {
        assert_eq!(mix64(0), 0);
    }

    #[test]
    fn pack_fields_disjoint() {
        let a = pack_sample(1, 0, 0, 0);
        let b = pack_sample(0, 1, 0, 0);
        let c = pack_sample(0, 0, 1, 0);
        let d = pack_sample(0, 0, 0, 1);
        assert_eq!(a & b, 0);
        assert_eq!(a & c, 0);
        assert_eq!(b & c, 0);
        assert_eq!(c & d, 0);
        assert_eq!(pack_sample(0xFF_FFFF, 0xFF_FFFF, 0xFF, 0xFF), u64::MAX);
    }

    #[test]
    fn expand_seed_deterministic() {
        assert_eq!(expand_seed(42), expand_seed(42));
        assert_ne!(expand_seed(42), expand_seed(43));
        let first: [u8; 8] = expand_seed(0)[..8].try_into().unwrap();
        assert_eq!(u64::from_le_bytes(first), 0xE220_A839_7B1D_CDAF);
    }
}

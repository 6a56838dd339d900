// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Embedding slot selection.
//!
//! Expands a [`Fingerprint`] into an ordered sequence of distinct interior
//! samples. A ChaCha20 PRNG is seeded from the fingerprint and draws slot
//! indices uniformly from `[0, capacity)`; a draw that repeats an earlier
//! slot is rejected and redrawn. Slot `i` of the sequence carries bit `i` of
//! the payload stream.
//!
//! # Incremental draws
//!
//! [`SlotSampler`] keeps its PRNG state between calls, so drawing 32 slots
//! and then 16 more yields exactly the first 48 slots of a fresh 48-slot
//! draw. Extraction relies on this: it reads the length header from the
//! first [`HEADER_BITS`](crate::stego::frame::HEADER_BITS) slots before it
//! knows how many more to ask for.
//!
//! # Cross-platform portability
//!
//! Draws use `u32` for `gen_range` (not `usize`) so the PRNG consumes the
//! same entropy per draw on 32-bit and 64-bit targets. Interior capacity is
//! bounded by [`MAX_DIMENSION`](crate::stego::MAX_DIMENSION) to stay below
//! `u32::MAX`.

use bitvec::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::mix::expand_seed;
use crate::stego::border::{Fingerprint, Interior};
use crate::stego::error::StegoError;

/// One embedding slot: the least-significant bit of sample `(x, y, channel)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub x: u32,
    pub y: u32,
    pub channel: u8,
}

impl Slot {
    /// Bit plane written by this slot. Always the LSB.
    pub const BIT_PLANE: u8 = 0;
}

/// Ordered, duplicate-free list of slots.
///
/// Only [`SlotSampler`] constructs plans, which is what guarantees the
/// uniqueness the embed kernel's disjoint writes rely on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingPlan {
    slots: Vec<Slot>,
}

impl EmbeddingPlan {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }
}

/// Stateful, deterministic slot generator.
pub struct SlotSampler {
    rng: ChaCha20Rng,
    interior: Interior,
    capacity: u32,
    /// One bit per interior slot, set once the slot is handed out.
    taken: BitVec<u64, Lsb0>,
    drawn: usize,
}

impl SlotSampler {
    /// Start a slot sequence for `fingerprint` over `interior`.
    ///
    /// # Errors
    /// [`StegoError::ImageTooSmall`] if the interior has no samples, and
    /// [`StegoError::Capacity`] if it has more than `u32::MAX` (unreachable
    /// for images within the dimension limits).
    pub fn new(fingerprint: Fingerprint, interior: Interior) -> Result<Self, StegoError> {
        let capacity = interior.capacity();
        if capacity == 0 {
            return Err(StegoError::ImageTooSmall {
                width: interior.width(),
                height: interior.height(),
                depth: crate::stego::BORDER_DEPTH,
            });
        }
        let capacity = u32::try_from(capacity)
            .map_err(|_| StegoError::Capacity { needed: capacity, capacity: u32::MAX as usize })?;
        Ok(Self {
            rng: ChaCha20Rng::from_seed(expand_seed(fingerprint.0)),
            interior,
            capacity,
            taken: BitVec::repeat(false, capacity as usize),
            drawn: 0,
        })
    }

    /// Total number of slots the interior offers.
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Slots handed out so far.
    pub fn drawn(&self) -> usize {
        self.drawn
    }

    /// Slots still available.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.drawn()
    }

    /// Draw the next `count` slots of the sequence.
    ///
    /// # Errors
    /// [`StegoError::Capacity`] if fewer than `count` slots remain. The
    /// sampler is left untouched in that case.
    pub fn draw(&mut self, count: usize) -> Result<EmbeddingPlan, StegoError> {
        if count > self.remaining() {
            return Err(StegoError::Capacity {
                needed: self.drawn() + count,
                capacity: self.capacity(),
            });
        }

        let mut slots = Vec::with_capacity(count);
        while slots.len() < count {
            let idx = self.rng.gen_range(0..self.capacity);
            if self.taken.replace(idx as usize, true) {
                continue; // already used, redraw
            }
            let (x, y, channel) = self.interior.locate(idx as usize);
            slots.push(Slot { x, y, channel });
        }
        self.drawn += count;
        Ok(EmbeddingPlan { slots })
    }
}

/// Generate a `slot_count`-slot plan in one go.
///
/// # Errors
/// [`StegoError::Capacity`] if `slot_count > interior.capacity()`.
pub fn plan(
    fingerprint: Fingerprint,
    interior: Interior,
    slot_count: usize,
) -> Result<EmbeddingPlan, StegoError> {
    let mut sampler = SlotSampler::new(fingerprint, interior)?;
    let plan = sampler.draw(slot_count)?;
    debug!(%fingerprint, slots = plan.len(), capacity = sampler.capacity(), "generated plan");
    Ok(plan)
}

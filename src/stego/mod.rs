// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Border-hash watermark embedding and extraction.
//!
//! The border ring of the image (every pixel within [`BORDER_DEPTH`] of an
//! edge) is hashed into a [`Fingerprint`](border::Fingerprint). That
//! fingerprint seeds the slot sequence that decides which interior samples
//! carry the message bits, one bit per sample LSB. The border itself is never
//! written, so extraction recomputes the same fingerprint and reads the same
//! slots back.
//!
//! Submodules, leaf-first:
//!
//! - [`border`]: border geometry and fingerprint reduction
//! - [`permute`]: fingerprint-seeded slot selection
//! - [`frame`]: length-prefixed bit stream codec
//! - [`device`]: parallel kernels and timing
//! - `pipeline`: [`embed_message`] / [`extract_message`] and file variants

pub mod error;
pub mod border;
pub mod permute;
pub mod frame;
pub mod capacity;
pub mod device;
mod pipeline;

pub use error::{DecodeError, StegoError};

/// Depth of the border ring, in pixels.
pub const BORDER_DEPTH: u32 = 2;

/// Minimum pixel dimension (width or height): a border on both sides plus
/// at least one interior pixel.
pub const MIN_DIMENSION: u32 = 2 * BORDER_DEPTH + 1;

/// Maximum pixel dimension (width or height).
///
/// Keeps the interior slot count (at most 16384² × 4 samples) below
/// `u32::MAX`, which the portable slot draws require.
pub const MAX_DIMENSION: u32 = 16_384;

/// Validate image dimensions for embedding and extraction.
///
/// # Errors
/// - [`StegoError::ImageTooSmall`] if either dimension < [`MIN_DIMENSION`].
/// - [`StegoError::ImageTooLarge`] if either dimension > [`MAX_DIMENSION`].
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), StegoError> {
    if width < MIN_DIMENSION || height < MIN_DIMENSION {
        return Err(StegoError::ImageTooSmall { width, height, depth: BORDER_DEPTH });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(StegoError::ImageTooLarge { width, height, max: MAX_DIMENSION });
    }
    Ok(())
}

pub use pipeline::{
    embed_file, embed_message, extract_file, extract_message, EmbedReport, ExtractReport,
    PAYLOAD_CHUNK_BITS,
};
pub use border::{fingerprint, Fingerprint};
pub use capacity::{interior_capacity, max_message_bytes};
pub use device::TimingRecord;

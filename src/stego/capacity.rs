// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Capacity estimation.
//!
//! One bit is embedded per interior sample, and the stream always starts
//! with the [`HEADER_BITS`]-bit length header. So an image with interior
//! capacity `C` holds messages of up to `(C - 32) / 8` bytes.

use crate::raster::Image;
use crate::stego::border::BorderRegion;
use crate::stego::error::StegoError;
use crate::stego::frame::{HEADER_BITS, MAX_PAYLOAD_BYTES};

/// Number of embeddable samples (bits) in `img`.
///
/// # Errors
/// [`StegoError::ImageTooSmall`] if the image has no interior.
pub fn interior_capacity(img: &Image) -> Result<usize, StegoError> {
    let region = BorderRegion::of(img)?;
    Ok(region.interior(img.channels()).capacity())
}

/// Largest message (in UTF-8 bytes) that fits in `img`.
///
/// Returns 0 when the interior cannot even hold the length header.
pub fn max_message_bytes(img: &Image) -> Result<usize, StegoError> {
    let bits = interior_capacity(img)?;
    Ok((bits.saturating_sub(HEADER_BITS) / 8).min(MAX_PAYLOAD_BYTES))
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Border region geometry and the border-hash fingerprint.
//!
//! The border is every pixel within `depth` of an image edge. It is never
//! written, so the fingerprint computed from it before embedding can be
//! recomputed after embedding and keys the same slot sequence.
//!
//! Each border sample `(x, y, c, v)` contributes `mix64(pack(x, y, c, v))`.
//! Contributions are summed with wrapping `u64` addition, which is associative
//! and commutative, so any split of the index space across workers and any
//! reduction tree produce the same sum as a left-to-right scan. The sum is
//! then mixed with the image geometry to give the [`Fingerprint`].
//!
//! Changing any single border sample changes exactly one contribution, and
//! since `mix64` is a bijection the sum and the final fingerprint change too.

use core::fmt;
use core::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::mix::{mix64, pack_sample};
use crate::raster::Image;
use crate::stego::error::StegoError;

/// 64-bit key derived from the border samples of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The ring of pixels within `depth` of any edge.
///
/// Border pixels are enumerated by a linear index: the top band row by row,
/// then the bottom band, then the left and right strips of each middle row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderRegion {
    width: u32,
    height: u32,
    depth: u32,
}

impl BorderRegion {
    /// Border of a `width × height` image at the given depth.
    ///
    /// # Errors
    /// [`StegoError::ImageTooSmall`] if the depth is zero or leaves no interior.
    pub fn new(width: u32, height: u32, depth: u32) -> Result<Self, StegoError> {
        let min = depth.saturating_mul(2).saturating_add(1);
        if depth == 0 || width < min || height < min {
            return Err(StegoError::ImageTooSmall { width, height, depth });
        }
        Ok(Self { width, height, depth })
    }

    /// Border of `img` at [`BORDER_DEPTH`](crate::stego::BORDER_DEPTH).
    pub fn of(img: &Image) -> Result<Self, StegoError> {
        Self::new(img.width(), img.height(), crate::stego::BORDER_DEPTH)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of border pixels.
    pub fn pixel_count(&self) -> usize {
        let (w, h, d) = (self.width as usize, self.height as usize, self.depth as usize);
        2 * d * w + 2 * d * (h - 2 * d)
    }

    /// Whether `(x, y)` lies in the border.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        let d = self.depth;
        x < d || y < d || x >= self.width - d || y >= self.height - d
    }

    /// Coordinate of border pixel `i` (`i < pixel_count()`).
    pub fn pixel_at(&self, i: usize) -> (u32, u32) {
        let (w, h, d) = (self.width as usize, self.height as usize, self.depth as usize);
        let band = d * w;
        if i < band {
            return ((i % w) as u32, (i / w) as u32);
        }
        let i = i - band;
        if i < band {
            return ((i % w) as u32, (h - d + i / w) as u32);
        }
        let i = i - band;
        let row = i / (2 * d);
        let k = i % (2 * d);
        let x = if k < d { k } else { w - 2 * d + k };
        (x as u32, (d + row) as u32)
    }

    /// Iterate over border pixels in index order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.pixel_count()).map(move |i| self.pixel_at(i))
    }

    /// The complement of the border.
    pub fn interior(&self, channels: u8) -> Interior {
        Interior {
            origin: self.depth,
            width: self.width - 2 * self.depth,
            height: self.height - 2 * self.depth,
            channels,
        }
    }
}

/// The rectangle of pixels outside the border, with its channel count.
///
/// Slot index `s` addresses interior pixel `s / channels`, channel
/// `s % channels`; interior pixels are numbered row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interior {
    origin: u32,
    width: u32,
    height: u32,
    channels: u8,
}

impl Interior {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of embeddable samples (one bit each).
    pub fn capacity(&self) -> usize {
        self.pixel_count() * self.channels as usize
    }

    /// Map a slot index to `(x, y, channel)` in image coordinates.
    pub fn locate(&self, slot: usize) -> (u32, u32, u8) {
        let channels = self.channels as usize;
        let pixel = slot / channels;
        let channel = (slot % channels) as u8;
        let x = self.origin + (pixel % self.width as usize) as u32;
        let y = self.origin + (pixel / self.width as usize) as u32;
        (x, y, channel)
    }
}

/// Contribution of border element `element` (pixel index × channels + channel).
#[inline]
pub fn border_partial(img: &Image, region: &BorderRegion, element: usize) -> u64 {
    let channels = img.channels() as usize;
    let (x, y) = region.pixel_at(element / channels);
    let c = (element % channels) as u8;
    mix64(pack_sample(x, y, c, img.get(x, y, c)))
}

/// Combine two partial sums. Associative and commutative.
#[inline]
pub fn combine(a: u64, b: u64) -> u64 {
    a.wrapping_add(b)
}

/// Number of border elements (pixels × channels) the hash kernel covers.
pub fn element_count(img: &Image, region: &BorderRegion) -> usize {
    region.pixel_count() * img.channels() as usize
}

/// Sequentially sum the partials of `range`.
pub fn sum_range(img: &Image, region: &BorderRegion, range: Range<usize>) -> u64 {
    range.map(|e| border_partial(img, region, e)).fold(0, combine)
}

/// Reduce all border partials, in parallel when the `parallel` feature is on.
pub(crate) fn reduce_border(img: &Image, region: &BorderRegion) -> u64 {
    let n = element_count(img, region);

    #[cfg(feature = "parallel")]
    let sum = (0..n)
        .into_par_iter()
        .map(|e| border_partial(img, region, e))
        .reduce(|| 0, combine);

    #[cfg(not(feature = "parallel"))]
    let sum = sum_range(img, region, 0..n);

    sum
}

/// Turn the reduced sum into a fingerprint bound to the image geometry.
pub fn finalize(sum: u64, img: &Image) -> Fingerprint {
    let geometry = ((img.width() as u64) << 32) | ((img.height() as u64) << 8) | img.channels() as u64;
    Fingerprint(mix64(sum ^ mix64(geometry)))
}

/// Compute the border-hash of `img` at the default border depth.
///
/// # Errors
/// [`StegoError::ImageTooSmall`] if the image has no interior.
pub fn fingerprint(img: &Image) -> Result<Fingerprint, StegoError> {
    let region = BorderRegion::of(img)?;
    Ok(finalize(reduce_border(img, &region), img))
}

/// Reference single-threaded scan, used to check the parallel reduction.
pub fn fingerprint_sequential(img: &Image) -> Result<Fingerprint, StegoError> {
    let region = BorderRegion::of(img)?;
    let n = element_count(img, &region);
    Ok(finalize(sum_range(img, &region, 0..n), img))
}

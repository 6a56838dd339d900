// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! In-memory pixel grid.
//!
//! [`Image`] is a plain 8-bit, channel-interleaved, row-major buffer with
//! explicit width, height and channel count. The watermark engine only ever
//! addresses individual samples by `(x, y, channel)`; decoding from and
//! encoding to files lives in [`io`].

pub mod error;
pub mod io;

pub use error::ImageIoError;

/// Largest channel count an [`Image`] may carry (RGBA).
pub const MAX_CHANNELS: u8 = 4;

/// A mutable 2D grid of 8-bit samples.
///
/// Sample `(x, y, c)` lives at `(y * width + x) * channels + c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u8,
    samples: Vec<u8>,
}

impl Image {
    /// Create a zero-filled image.
    pub fn new(width: u32, height: u32, channels: u8) -> Result<Self, ImageIoError> {
        check_layout(width, height, channels)?;
        let len = width as usize * height as usize * channels as usize;
        Ok(Self { width, height, channels, samples: vec![0u8; len] })
    }

    /// Wrap an existing interleaved sample buffer.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        samples: Vec<u8>,
    ) -> Result<Self, ImageIoError> {
        check_layout(width, height, channels)?;
        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(ImageIoError::BufferSize { expected, actual: samples.len() });
        }
        Ok(Self { width, height, channels, samples })
    }

    /// Build an image by evaluating `f(x, y, channel)` for every sample.
    pub fn from_fn<F>(width: u32, height: u32, channels: u8, mut f: F) -> Result<Self, ImageIoError>
    where
        F: FnMut(u32, u32, u8) -> u8,
    {
        let mut img = Self::new(width, height, channels)?;
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    img.set(x, y, c, f(x, y, c));
                }
            }
        }
        Ok(img)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Flat index of sample `(x, y, channel)`.
    #[inline]
    pub fn sample_index(&self, x: u32, y: u32, channel: u8) -> usize {
        debug_assert!(x < self.width && y < self.height && channel < self.channels);
        (y as usize * self.width as usize + x as usize) * self.channels as usize + channel as usize
    }

    /// Read one sample.
    #[inline]
    pub fn get(&self, x: u32, y: u32, channel: u8) -> u8 {
        self.samples[self.sample_index(x, y, channel)]
    }

    /// Write one sample.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, channel: u8, value: u8) {
        let idx = self.sample_index(x, y, channel);
        self.samples[idx] = value;
    }

    /// All channel samples of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = self.sample_index(x, y, 0);
        &self.samples[start..start + self.channels as usize]
    }

    /// The interleaved sample buffer.
    pub fn as_raw(&self) -> &[u8] {
        &self.samples
    }

    /// Mutable access to the sample buffer for the embed kernel.
    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.samples
    }
}

fn check_layout(width: u32, height: u32, channels: u8) -> Result<(), ImageIoError> {
    if width == 0 || height == 0 || channels == 0 || channels > MAX_CHANNELS {
        return Err(ImageIoError::UnsupportedLayout { width, height, channels });
    }
    Ok(())
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Error types for pixel-grid construction and image file I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building, loading or saving an [`Image`](super::Image).
#[derive(Error, Debug)]
pub enum ImageIoError {
    /// The input path does not exist.
    #[error("input file '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be decoded as an image.
    #[error("cannot decode image '{}': {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// The image could not be encoded or written.
    #[error("cannot write image '{}': {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    /// The output format would discard least-significant bits.
    #[error("refusing to save to lossy format '{extension}' (use png, bmp, tiff, tga or pnm)")]
    LossyFormat { extension: String },

    /// Raw sample buffer does not match `width * height * channels`.
    #[error("sample buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// Channel count outside the supported 1–4 range, or a zero dimension.
    #[error("unsupported pixel layout: {width}x{height} with {channels} channels")]
    UnsupportedLayout { width: u32, height: u32, channels: u8 },
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Error types for the watermarking pipeline.
//!
//! [`StegoError`] covers every expected failure from image validation through
//! plan generation and payload decoding. Each variant is raised where it is
//! detected and passed through the pipeline unchanged.

use thiserror::Error;

use crate::raster::ImageIoError;

/// Errors that can occur during embedding or extraction.
#[derive(Error, Debug)]
pub enum StegoError {
    /// Border region or interior is empty at the configured border depth.
    #[error("image too small: {width}x{height} leaves no interior at border depth {depth}")]
    ImageTooSmall { width: u32, height: u32, depth: u32 },

    /// Either dimension exceeds [`MAX_DIMENSION`](crate::stego::MAX_DIMENSION).
    #[error("image too large: {width}x{height} (max {max}px per side)")]
    ImageTooLarge { width: u32, height: u32, max: u32 },

    /// The plan needs more slots than the interior offers.
    #[error("message too long for this image: needs {needed} bits, interior holds {capacity}")]
    Capacity { needed: usize, capacity: usize },

    /// The message exceeds the codec's hard payload limit.
    #[error("message exceeds the {max}-byte payload limit")]
    MessageTooLarge { max: usize },

    /// Extracted bits do not form a plausible payload.
    #[error("cannot decode watermark: {0}")]
    Decode(#[from] DecodeError),

    /// Loading or saving the image failed.
    #[error(transparent)]
    Io(#[from] ImageIoError),

    /// The parallel device could not be set up.
    #[error("device unavailable: {0}")]
    Device(String),
}

/// Reasons an extracted bit stream is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bits than the fixed-width length header.
    #[error("truncated header: {0} bits")]
    TruncatedHeader(usize),

    /// Declared payload length is not a whole number of bytes.
    #[error("payload length {0} bits is not a multiple of 8")]
    UnalignedLength(usize),

    /// Declared payload length is above the codec limit or the interior capacity.
    #[error("payload length {bits} bits exceeds the maximum of {max}")]
    ImplausibleLength { bits: usize, max: usize },

    /// Fewer payload bits available than the header declares.
    #[error("truncated payload: header declares {declared} bits, got {available}")]
    TruncatedPayload { declared: usize, available: usize },

    /// Payload bytes are not valid UTF-8.
    #[error("payload is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidUtf8 { offset: usize },
}

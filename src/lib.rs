// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! # borderhash
//!
//! Text watermarking for lossless images, keyed by the image's own border.
//!
//! The pixels within a few samples of every edge are hashed into a 64-bit
//! fingerprint. The fingerprint seeds a pseudo-random, collision-free choice
//! of interior samples, and the message (with a 32-bit length header) is
//! written into their least-significant bits. Because the border is never
//! modified, extraction recomputes the same fingerprint and reads the same
//! samples back. No key or side channel is needed, and nothing is stored
//! outside the pixel data.
//!
//! Hashing, embedding and extraction run as data-parallel kernels on a
//! call-scoped worker pool (`parallel` feature, on by default), and every
//! call reports kernel time separately from end-to-end time.
//!
//! This is not a cryptographic scheme and does not survive lossy
//! recompression, cropping or resizing.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use borderhash::{embed_message, extract_message, Image};
//!
//! let cover = borderhash::raster::io::load("cover.png").unwrap();
//! let (marked, timing) = embed_message(&cover, "hello").unwrap();
//! let (text, _) = extract_message(&marked).unwrap();
//! assert_eq!(text, "hello");
//! println!("{timing}");
//! ```

pub mod mix;
pub mod raster;
pub mod stego;

pub use raster::{Image, ImageIoError};
pub use stego::{embed_message, extract_message, embed_file, extract_file, EmbedReport, ExtractReport};
pub use stego::{fingerprint, Fingerprint, TimingRecord, StegoError, DecodeError};
pub use stego::{interior_capacity, max_message_bytes, validate_dimensions};
pub use stego::{BORDER_DEPTH, MIN_DIMENSION, MAX_DIMENSION};
pub use stego::frame::{HEADER_BITS, MAX_PAYLOAD_BYTES};

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Payload bit stream construction and parsing.
//!
//! The bit stream is what gets written, one bit per embedding slot:
//!
//! ```text
//! [32 bits ] payload length in bits (big-endian u32, MSB first)
//! [N bits  ] message bytes, MSB first within each byte, in message order
//! ```
//!
//! There is no checksum and no terminator. The length header is validated on
//! extraction (byte-aligned, below [`MAX_PAYLOAD_BITS`] and below the image's
//! interior capacity), and the payload must be valid UTF-8. Invalid UTF-8 is
//! always rejected, never replaced.

use crate::stego::error::{DecodeError, StegoError};

/// Width of the length header in bits.
pub const HEADER_BITS: usize = 32;

/// Largest message the codec accepts, in bytes (16 MiB).
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

/// [`MAX_PAYLOAD_BYTES`] in bits.
pub const MAX_PAYLOAD_BITS: usize = MAX_PAYLOAD_BYTES * 8;

/// Total stream length for a message of `message_bytes` bytes.
pub fn stream_bits(message_bytes: usize) -> usize {
    HEADER_BITS + message_bytes * 8
}

/// Encode a message as `[header][payload]` bits.
///
/// # Errors
/// Returns [`StegoError::MessageTooLarge`] above [`MAX_PAYLOAD_BYTES`].
pub fn encode_message(message: &str) -> Result<Vec<u8>, StegoError> {
    let bytes = message.as_bytes();
    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(StegoError::MessageTooLarge { max: MAX_PAYLOAD_BYTES });
    }

    let payload_bits = (bytes.len() * 8) as u32;
    let mut bits = Vec::with_capacity(stream_bits(bytes.len()));
    bits.extend(bytes_to_bits(&payload_bits.to_be_bytes()));
    bits.extend(bytes_to_bits(bytes));
    Ok(bits)
}

/// Parse the length header and return the declared payload length in bits.
///
/// Only the first [`HEADER_BITS`] bits are read; anything after is ignored.
pub fn decode_header(bits: &[u8]) -> Result<usize, DecodeError> {
    if bits.len() < HEADER_BITS {
        return Err(DecodeError::TruncatedHeader(bits.len()));
    }
    let header: [u8; 4] = bits_to_bytes(&bits[..HEADER_BITS])
        .try_into()
        .map_err(|_| DecodeError::TruncatedHeader(bits.len()))?;
    let declared = u32::from_be_bytes(header) as usize;

    if declared % 8 != 0 {
        return Err(DecodeError::UnalignedLength(declared));
    }
    if declared > MAX_PAYLOAD_BITS {
        return Err(DecodeError::ImplausibleLength { bits: declared, max: MAX_PAYLOAD_BITS });
    }
    Ok(declared)
}

/// Regroup payload bits into bytes and decode them as UTF-8.
pub fn decode_payload(bits: &[u8]) -> Result<String, DecodeError> {
    let mut decoder = PayloadDecoder::new();
    decoder.push_bits(bits)?;
    decoder.finish()
}

/// Chunked payload decoder.
///
/// Bits are pushed a chunk at a time and the bytes seen so far are checked
/// for UTF-8 on every push, so a stream that goes bad in its first chunk is
/// rejected without reading the rest. A multi-byte sequence split across two
/// chunks is carried over to the next push.
#[derive(Debug, Default)]
pub struct PayloadDecoder {
    bytes: Vec<u8>,
    /// Length of the prefix of `bytes` known to be valid UTF-8.
    valid: usize,
}

impl PayloadDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload bytes accepted so far.
    pub fn bytes_decoded(&self) -> usize {
        self.bytes.len()
    }

    /// Append `bits` (a whole number of bytes, MSB first).
    ///
    /// # Errors
    /// [`DecodeError::UnalignedLength`] if `bits` is not byte-aligned, and
    /// [`DecodeError::InvalidUtf8`] as soon as the bytes cannot be the start
    /// of a valid UTF-8 string.
    pub fn push_bits(&mut self, bits: &[u8]) -> Result<(), DecodeError> {
        if bits.len() % 8 != 0 {
            return Err(DecodeError::UnalignedLength(bits.len()));
        }
        self.bytes.extend(bits_to_bytes(bits));
        match core::str::from_utf8(&self.bytes[self.valid..]) {
            Ok(_) => self.valid = self.bytes.len(),
            Err(e) => match e.error_len() {
                // Incomplete sequence at the end; wait for the next chunk.
                None => self.valid += e.valid_up_to(),
                Some(_) => {
                    return Err(DecodeError::InvalidUtf8 { offset: self.valid + e.valid_up_to() })
                }
            },
        }
        Ok(())
    }

    /// Finish decoding. Fails if the stream ends inside a UTF-8 sequence.
    pub fn finish(self) -> Result<String, DecodeError> {
        String::from_utf8(self.bytes).map_err(|e| DecodeError::InvalidUtf8 {
            offset: e.utf8_error().valid_up_to(),
        })
    }
}

/// Decode a complete `[header][payload]` stream.
///
/// Trailing bits beyond the declared payload are ignored.
pub fn decode_message(bits: &[u8]) -> Result<String, DecodeError> {
    let declared = decode_header(bits)?;
    let available = bits.len() - HEADER_BITS;
    if available < declared {
        return Err(DecodeError::TruncatedPayload { declared, available });
    }
    decode_payload(&bits[HEADER_BITS..HEADER_BITS + declared])
}

/// Convert bytes to a bit vector (MSB first within each byte).
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for bit_pos in (0..8).rev() {
            bits.push((byte >> bit_pos) & 1);
        }
    }
    bits
}

/// Convert a bit vector (MSB first) back to bytes.
/// Pads the last byte with zero bits if `bits.len()` is not a multiple of 8.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity((bits.len() + 7) / 8);
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            byte |= (bit & 1) << (7 - i);
        }
        bytes.push(byte);
    }
    bytes
}

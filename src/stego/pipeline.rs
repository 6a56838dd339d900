// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Embed/extract pipeline.
//!
//! Embedding:
//! 1. Validate dimensions and stage the image on the device.
//! 2. Hash the border into a fingerprint (kernel, then barrier).
//! 3. Encode the message into `[header][payload]` bits.
//! 4. Draw one slot per bit from the fingerprint-seeded sequence.
//! 5. Write each bit into its slot's LSB (kernel) and download the result.
//!
//! Extraction repeats steps 1–2, draws the header slots, reads and validates
//! the length, then continues the same slot sequence for the payload. The
//! payload is read [`PAYLOAD_CHUNK_BITS`] at a time and rejected at the first
//! chunk that is not valid UTF-8, so a bogus header on an unmarked image
//! cannot make extraction walk the whole interior.
//!
//! The caller's image is never modified. Embedding works on the device copy
//! and returns it only after every step succeeded.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::raster::{io, Image};
use crate::stego::border::BorderRegion;
use crate::stego::device::{Device, TimingRecord};
use crate::stego::error::{DecodeError, StegoError};
use crate::stego::frame::{self, PayloadDecoder, HEADER_BITS};
use crate::stego::permute::{self, SlotSampler};

/// Payload bits drawn and read per extract launch (8 KiB of message).
pub const PAYLOAD_CHUNK_BITS: usize = 64 * 1024;

/// Outcome of [`embed_file`].
#[derive(Debug, Clone)]
pub struct EmbedReport {
    /// Bits written, header included.
    pub bits_embedded: usize,
    pub timing: TimingRecord,
}

/// Outcome of [`extract_file`].
#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub message: String,
    pub timing: TimingRecord,
}

/// Embed `message` into a copy of `image`.
///
/// # Returns
/// The watermarked image and the call's timing. Total time covers device
/// acquisition, staging, planning and all kernels.
///
/// # Errors
/// - [`StegoError::ImageTooSmall`] / [`StegoError::ImageTooLarge`] for
///   unsupported dimensions.
/// - [`StegoError::MessageTooLarge`] above the codec limit.
/// - [`StegoError::Capacity`] if the interior cannot hold the bit stream.
pub fn embed_message(image: &Image, message: &str) -> Result<(Image, TimingRecord), StegoError> {
    let mut device = Device::acquire()?;
    let (watermarked, _) = embed_on(&mut device, image, message)?;
    Ok((watermarked, device.timing()))
}

/// Recover the message embedded in `image`.
///
/// # Errors
/// - [`StegoError::ImageTooSmall`] / [`StegoError::ImageTooLarge`] for
///   unsupported dimensions.
/// - [`StegoError::Capacity`] if the interior cannot hold a length header.
/// - [`StegoError::Decode`] if the header is implausible or the payload is
///   not UTF-8 (e.g. no watermark, or the border was altered).
pub fn extract_message(image: &Image) -> Result<(String, TimingRecord), StegoError> {
    let mut device = Device::acquire()?;
    let message = extract_on(&mut device, image)?;
    Ok((message, device.timing()))
}

/// Load `input`, embed `message`, and save the result to `output`.
///
/// Nothing is written unless embedding succeeded. Total time includes
/// loading and saving.
pub fn embed_file<P, Q>(input: P, output: Q, message: &str) -> Result<EmbedReport, StegoError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let start = Instant::now();
    let image = io::load(input)?;
    let mut device = Device::acquire()?;
    let (watermarked, bits_embedded) = embed_on(&mut device, &image, message)?;
    io::save(&watermarked, output)?;
    Ok(EmbedReport { bits_embedded, timing: device.timing_since(start) })
}

/// Load `input` and extract its message. Total time includes loading.
pub fn extract_file<P: AsRef<Path>>(input: P) -> Result<ExtractReport, StegoError> {
    let start = Instant::now();
    let image = io::load(input)?;
    let mut device = Device::acquire()?;
    let message = extract_on(&mut device, &image)?;
    Ok(ExtractReport { message, timing: device.timing_since(start) })
}

fn embed_on(device: &mut Device, image: &Image, message: &str) -> Result<(Image, usize), StegoError> {
    super::validate_dimensions(image.width(), image.height())?;
    let region = BorderRegion::of(image)?;
    let interior = region.interior(image.channels());

    // 1. Stage and fingerprint.
    let mut buf = device.upload(image);
    let fingerprint = device.hash(&buf, &region);
    debug!(%fingerprint, "border hashed");

    // 2. Encode.
    let bits = frame::encode_message(message)?;

    // 3. Plan. Capacity errors surface here, before anything is written.
    let plan = permute::plan(fingerprint, interior, bits.len())?;

    // 4. Embed and hand back.
    device.embed(&mut buf, &plan, &bits);
    let watermarked = device.download(buf);

    info!(
        bits = bits.len(),
        capacity = interior.capacity(),
        "message embedded"
    );
    Ok((watermarked, bits.len()))
}

fn extract_on(device: &mut Device, image: &Image) -> Result<String, StegoError> {
    super::validate_dimensions(image.width(), image.height())?;
    let region = BorderRegion::of(image)?;
    let interior = region.interior(image.channels());

    // 1. Stage and fingerprint.
    let buf = device.upload(image);
    let fingerprint = device.hash(&buf, &region);
    debug!(%fingerprint, "border hashed");

    // 2. Header slots come first in the sequence.
    let mut sampler = SlotSampler::new(fingerprint, interior)?;
    let header_plan = sampler.draw(HEADER_BITS)?;
    let header_bits = device.extract(&buf, &header_plan);
    let declared = frame::decode_header(&header_bits)?;

    if declared > sampler.remaining() {
        return Err(DecodeError::ImplausibleLength { bits: declared, max: sampler.remaining() }.into());
    }

    // 3. Payload slots continue the same sequence, one chunk per launch.
    let mut decoder = PayloadDecoder::new();
    let mut left = declared;
    while left > 0 {
        let n = left.min(PAYLOAD_CHUNK_BITS);
        let chunk = sampler.draw(n)?;
        decoder.push_bits(&device.extract(&buf, &chunk))?;
        left -= n;
    }
    let message = decoder.finish()?;

    info!(bits = HEADER_BITS + declared, "message extracted");
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mix::mix64;
    use crate::stego::border::fingerprint;

    fn noisy(width: u32, height: u32, channels: u8, salt: u64) -> Image {
        Image::from_fn(width, height, channels, |x, y, c| {
            (mix64(salt ^ ((x as u64) << 32) ^ ((y as u64) << 8) ^ c as u64) >> 56) as u8
        })
        .unwrap()
    }

    #[test]
    fn roundtrip_basic() {
        let img = noisy(64, 64, 3, 1);
        let (marked, timing) = embed_message(&img, "hi").unwrap();
        assert!(timing.total() >= timing.gpu());
        let (message, _) = extract_message(&marked).unwrap();
        assert_eq!(message, "hi");
    }

    #[test]
    fn input_image_untouched() {
        let img = noisy(32, 32, 3, 2);
        let copy = img.clone();
        let _ = embed_message(&img, "leave me alone").unwrap();
        assert_eq!(img, copy);
    }

    #[test]
    fn fingerprint_survives_embedding() {
        let img = noisy(40, 30, 4, 3);
        let (marked, _) = embed_message(&img, "border stays put").unwrap();
        assert_eq!(fingerprint(&img).unwrap(), fingerprint(&marked).unwrap());
    }

    #[test]
    fn empty_message_roundtrip() {
        let img = noisy(16, 16, 3, 4);
        let (marked, _) = embed_message(&img, "").unwrap();
        assert_eq!(extract_message(&marked).unwrap().0, "");
    }

    #[test]
    fn grayscale_roundtrip() {
        let img = noisy(30, 30, 1, 5);
        let (marked, _) = embed_message(&img, "mono").unwrap();
        assert_eq!(extract_message(&marked).unwrap().0, "mono");
    }

    #[test]
    fn too_long_message_is_capacity_error() {
        // 12x12 depth 2: 8*8*3 = 192 bits, 160 for payload = 20 bytes.
        let img = noisy(12, 12, 3, 6);
        assert!(embed_message(&img, &"a".repeat(20)).is_ok());
        match embed_message(&img, &"a".repeat(21)) {
            Err(StegoError::Capacity { needed, capacity }) => {
                assert_eq!(needed, 32 + 21 * 8);
                assert_eq!(capacity, 192);
            }
            other => panic!("expected Capacity, got {other:?}"),
        }
    }

    #[test]
    fn too_small_image() {
        let img = noisy(4, 64, 3, 7);
        assert!(matches!(embed_message(&img, "x"), Err(StegoError::ImageTooSmall { .. })));
        assert!(matches!(extract_message(&img), Err(StegoError::ImageTooSmall { .. })));
    }

    #[test]
    fn header_needs_room_on_extract() {
        // 6x6 depth 2: 2*2*3 = 12 interior bits, less than the header.
        let img = noisy(6, 6, 3, 8);
        assert!(matches!(extract_message(&img), Err(StegoError::Capacity { .. })));
    }

    /// Overwrite the header slots of `img` with a length of `declared_bits`.
    fn with_header(img: &Image, declared_bits: u32) -> Image {
        let interior = BorderRegion::of(img).unwrap().interior(img.channels());
        let fp = fingerprint(img).unwrap();
        let header_plan = permute::plan(fp, interior, HEADER_BITS).unwrap();
        let header = frame::bytes_to_bits(&declared_bits.to_be_bytes());

        let mut device = Device::acquire().unwrap();
        let mut buf = device.upload(img);
        device.embed(&mut buf, &header_plan, &header);
        device.download(buf)
    }

    #[test]
    fn declared_length_beyond_interior_rejected() {
        let img = noisy(10, 10, 3, 9);
        let interior = BorderRegion::of(&img).unwrap().interior(3);
        let forged = with_header(&img, 1024 * 8);

        match extract_message(&forged) {
            Err(StegoError::Decode(DecodeError::ImplausibleLength { bits, max })) => {
                assert_eq!(bits, 8192);
                assert_eq!(max, interior.capacity() - HEADER_BITS);
            }
            other => panic!("expected ImplausibleLength, got {other:?}"),
        }
    }

    #[test]
    fn large_declared_length_stops_at_first_bad_chunk() {
        // Interior 252*252*3 = 190512 slots; the header claims most of them
        // but the unmarked LSBs are not UTF-8.
        let img = noisy(256, 256, 3, 12);
        let declared = 160_000;
        assert!(declared > 2 * PAYLOAD_CHUNK_BITS);
        let forged = with_header(&img, declared as u32);

        let mut device = Device::acquire().unwrap();
        match extract_on(&mut device, &forged) {
            Err(StegoError::Decode(DecodeError::InvalidUtf8 { offset })) => {
                assert!(offset < PAYLOAD_CHUNK_BITS / 8);
            }
            other => panic!("expected InvalidUtf8, got {other:?}"),
        }
        // hash, header, first payload chunk
        assert_eq!(device.launches(), 3);
    }

    #[test]
    fn multi_chunk_payload_roundtrip() {
        // 9000 bytes spans two payload chunks, with a 'ß' split across them.
        let img = noisy(200, 200, 3, 13);
        let msg: String = (0..4500).map(|i| ['a', 'ß', '€'][i % 3]).collect();
        assert!(msg.len() * 8 > PAYLOAD_CHUNK_BITS);
        let (marked, _) = embed_message(&img, &msg).unwrap();
        assert_eq!(extract_message(&marked).unwrap().0, msg);
    }

    #[test]
    fn file_roundtrip_reports_bits() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cover.png");
        let output = dir.path().join("marked.png");
        io::save(&noisy(50, 40, 3, 10), &input).unwrap();

        let report = embed_file(&input, &output, "file level").unwrap();
        assert_eq!(report.bits_embedded, 32 + 10 * 8);
        assert!(report.timing.total() >= report.timing.gpu());

        let extracted = extract_file(&output).unwrap();
        assert_eq!(extracted.message, "file level");
    }

    #[test]
    fn failed_embed_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cover.png");
        let output = dir.path().join("marked.png");
        io::save(&noisy(10, 10, 3, 11), &input).unwrap();

        let err = embed_file(&input, &output, &"x".repeat(500)).unwrap_err();
        assert!(matches!(err, StegoError::Capacity { .. }));
        assert!(!output.exists());
    }
}

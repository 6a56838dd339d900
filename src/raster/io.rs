// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Image file load/save on top of the `image` crate.
//!
//! Decoded images are normalized to 8 bits per sample. Grayscale stays
//! single-channel, colour becomes RGB, and an alpha channel is kept when the
//! source has one. Saving picks the encoder from the file extension and only
//! accepts lossless formats, since any lossy encoder would wipe the embedded
//! least-significant bits.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, LumaA, Rgb, Rgba};
use tracing::debug;

use super::{Image, ImageIoError};

/// Load an image file into an 8-bit [`Image`].
///
/// # Errors
/// - [`ImageIoError::NotFound`] if `path` does not exist.
/// - [`ImageIoError::Decode`] if the file is not a decodable image.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Image, ImageIoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ImageIoError::NotFound(path.to_path_buf()));
    }

    let dynamic = image::open(path).map_err(|e| ImageIoError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let img = from_dynamic(&dynamic)?;
    debug!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        channels = img.channels(),
        "loaded image"
    );
    Ok(img)
}

/// Save an [`Image`] to `path`, choosing the format from the extension.
///
/// # Errors
/// - [`ImageIoError::LossyFormat`] for JPEG, WebP, GIF and other formats that
///   do not preserve every sample bit.
/// - [`ImageIoError::Encode`] if the extension is unknown or encoding fails.
pub fn save<P: AsRef<Path>>(img: &Image, path: P) -> Result<(), ImageIoError> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).map_err(|e| ImageIoError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !is_lossless(format) {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(ImageIoError::LossyFormat { extension });
    }

    let dynamic = to_dynamic(img);
    dynamic.save_with_format(path, format).map_err(|e| ImageIoError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), ?format, "saved image");
    Ok(())
}

/// Formats whose encoders round-trip 8-bit samples exactly.
fn is_lossless(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tiff | ImageFormat::Tga | ImageFormat::Pnm
    )
}

/// Convert a decoded image into the engine's 8-bit interleaved layout.
pub fn from_dynamic(dynamic: &DynamicImage) -> Result<Image, ImageIoError> {
    let color = dynamic.color();
    let (width, height) = (dynamic.width(), dynamic.height());
    let (channels, samples) = match (color.has_color(), color.has_alpha()) {
        (false, false) => (1, dynamic.to_luma8().into_raw()),
        (false, true) => (2, dynamic.to_luma_alpha8().into_raw()),
        (true, false) => (3, dynamic.to_rgb8().into_raw()),
        (true, true) => (4, dynamic.to_rgba8().into_raw()),
    };
    Image::from_raw(width, height, channels, samples)
}

/// Convert an engine image back into an `image` crate buffer.
pub fn to_dynamic(img: &Image) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let raw = img.as_raw().to_vec();
    // Buffer length is an `Image` invariant, so `from_raw` cannot fail here.
    let built = match img.channels() {
        1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
        2 => ImageBuffer::<LumaA<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageLumaA8),
        3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
        _ => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
    };
    built.expect("Image buffer length matches its dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(channels: u8) -> Image {
        Image::from_fn(16, 9, channels, |x, y, c| (x * 13 + y * 7 + c as u32 * 31) as u8).unwrap()
    }

    #[test]
    fn png_roundtrip_preserves_every_sample() {
        let dir = tempfile::tempdir().unwrap();
        for channels in 1..=4u8 {
            let img = gradient(channels);
            let path = dir.path().join(format!("g{channels}.png"));
            save(&img, &path).unwrap();
            let back = load(&path).unwrap();
            assert_eq!(back, img, "channels={channels}");
        }
    }

    #[test]
    fn bmp_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let img = gradient(3);
        let path = dir.path().join("g.bmp");
        save(&img, &path).unwrap();
        assert_eq!(load(&path).unwrap(), img);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, ImageIoError::NotFound(_)));
    }

    #[test]
    fn garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load(&path), Err(ImageIoError::Decode { .. })));
    }

    #[test]
    fn lossy_output_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let err = save(&gradient(3), &path).unwrap_err();
        assert!(matches!(err, ImageIoError::LossyFormat { ref extension } if extension == "jpg"));
        assert!(!path.exists());
    }

    #[test]
    fn unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = save(&gradient(3), dir.path().join("out.xyz")).unwrap_err();
        assert!(matches!(err, ImageIoError::Encode { .. }));
    }
}

//! Image transcoding: decode embedded media, normalize, downscale and
//! re-encode as a compact `data:` URI.
//!
//! Transcoding never fails a conversion. An image that cannot be decoded or
//! re-encoded is embedded with its original bytes; an image whose part cannot
//! be read is omitted.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::{Result, XlstaticError};
use crate::package::Package;
use crate::types::{Diagnostic, DiagnosticKind, ImageAsset};

/// A re-encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    #[must_use]
    pub fn data_uri(&self) -> String {
        data_uri(self.mime_type, &self.bytes)
    }
}

/// What happened to one media part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    Transcoded { data_uri: String, width: u32, height: u32 },
    /// Original bytes embedded after a decode or encode failure
    Original { data_uri: String, reason: String },
    /// Part unreadable; nothing to embed
    Omitted { reason: String },
}

impl TranscodeOutcome {
    /// The URI to embed; empty for an omitted image.
    #[must_use]
    pub fn data_uri(&self) -> &str {
        match self {
            Self::Transcoded { data_uri, .. } | Self::Original { data_uri, .. } => data_uri,
            Self::Omitted { .. } => "",
        }
    }
}

/// Build a base64 `data:` URI.
#[must_use]
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

/// MIME type for embedding original bytes, inferred from the extension.
#[must_use]
pub fn fallback_mime(media_path: &str) -> &'static str {
    let ext = media_path.rsplit('.').next().unwrap_or_default();
    if ext.eq_ignore_ascii_case("png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// Target size for an image at most `max_width` wide, keeping aspect ratio.
#[must_use]
pub fn scaled_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 || max_width == 0 {
        return (width, height);
    }
    let scaled = f64::from(height) * f64::from(max_width) / f64::from(width);
    (max_width, f64_to_u32_clamped(scaled.round()).max(1))
}

/// Decode, normalize, downscale and re-encode one image.
///
/// Images with an alpha channel become RGBA and are encoded as lossless
/// WebP; everything else becomes RGB and is encoded as JPEG at `quality`.
///
/// # Errors
/// Returns [`XlstaticError::Image`] if the bytes cannot be decoded or the
/// result cannot be encoded.
pub fn transcode(bytes: &[u8], media_path: &str, max_width: u32, quality: u8) -> Result<EncodedImage> {
    let image_err = |source: image::ImageError| XlstaticError::Image {
        part: media_path.to_string(),
        source,
    };

    let decoded = image::load_from_memory(bytes).map_err(image_err)?;
    let has_alpha = decoded.color().has_alpha();
    let normalized = if has_alpha {
        DynamicImage::ImageRgba8(decoded.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(decoded.to_rgb8())
    };
    drop(decoded);

    let (width, height) = scaled_size(normalized.width(), normalized.height(), max_width);
    let resized = if width == normalized.width() && height == normalized.height() {
        normalized
    } else {
        normalized.resize_exact(width, height, FilterType::Lanczos3)
    };

    let mut out = Vec::new();
    let mime_type = if has_alpha {
        resized
            .write_with_encoder(WebPEncoder::new_lossless(&mut out))
            .map_err(image_err)?;
        "image/webp"
    } else {
        resized
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)))
            .map_err(image_err)?;
        "image/jpeg"
    };

    Ok(EncodedImage {
        mime_type,
        bytes: out,
        width,
        height,
    })
}

/// Per-run transcoder; each media path is transcoded at most once.
#[derive(Debug)]
pub struct Transcoder {
    max_width: u32,
    quality: u8,
    cache: HashMap<String, TranscodeOutcome>,
    diagnostics: Vec<Diagnostic>,
}

impl Transcoder {
    #[must_use]
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self {
            max_width,
            quality,
            cache: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Outcome for a media part, computed on first request.
    pub fn transcode_part(&mut self, package: &Package, media_path: &str) -> &TranscodeOutcome {
        let (max_width, quality) = (self.max_width, self.quality);
        let diagnostics = &mut self.diagnostics;
        self.cache
            .entry(media_path.to_string())
            .or_insert_with(|| {
                let asset = package
                    .part(media_path)
                    .filter(|bytes| !bytes.is_empty())
                    .map(|bytes| ImageAsset { media_path, bytes });
                compute_outcome(asset, media_path, max_width, quality, diagnostics)
            })
    }

    /// Distinct media paths seen so far.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Diagnostics for every image that could not be transcoded.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

fn compute_outcome(
    asset: Option<ImageAsset<'_>>,
    media_path: &str,
    max_width: u32,
    quality: u8,
    diagnostics: &mut Vec<Diagnostic>,
) -> TranscodeOutcome {
    let Some(ImageAsset { bytes, .. }) = asset else {
        let reason = "media part is missing or empty".to_string();
        warn!(media = media_path, "{reason}");
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::ImageDecode,
            media_path,
            &reason,
        ));
        return TranscodeOutcome::Omitted { reason };
    };

    match transcode(bytes, media_path, max_width, quality) {
        Ok(encoded) => {
            debug!(
                media = media_path,
                from = bytes.len(),
                to = encoded.bytes.len(),
                width = encoded.width,
                height = encoded.height,
                "image transcoded"
            );
            TranscodeOutcome::Transcoded {
                data_uri: encoded.data_uri(),
                width: encoded.width,
                height: encoded.height,
            }
        }
        Err(err) => {
            warn!(media = media_path, error = %err, "embedding original image bytes");
            diagnostics.push(Diagnostic::new(DiagnosticKind::ImageDecode, media_path, &err));
            TranscodeOutcome::Original {
                data_uri: data_uri(fallback_mime(media_path), bytes),
                reason: err.to_string(),
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn f64_to_u32_clamped(v: f64) -> u32 {
    v.clamp(0.0, f64::from(u32::MAX)).floor() as u32
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;
    use test_case::test_case;

    fn png_rgb(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn png_rgba(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test_case(600, 400, 300, (300, 200))]
    #[test_case(1000, 333, 300, (300, 100))]
    #[test_case(300, 50, 300, (300, 50))]
    #[test_case(120, 80, 300, (120, 80))]
    #[test_case(3000, 1, 300, (300, 1))]
    fn scaling(width: u32, height: u32, max: u32, expected: (u32, u32)) {
        assert_eq!(scaled_size(width, height, max), expected);
    }

    #[test]
    fn wide_opaque_image_becomes_small_jpeg() {
        let encoded = transcode(&png_rgb(600, 401), "xl/media/image1.png", 300, 50).unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");
        assert_eq!(encoded.width, 300);
        assert!((i64::from(encoded.height) - 200).abs() <= 1);
        let roundtrip = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(roundtrip.width(), 300);
        assert!(encoded.data_uri().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn alpha_image_keeps_transparency() {
        let encoded = transcode(&png_rgba(40, 20), "xl/media/image2.png", 300, 50).unwrap();
        assert_eq!(encoded.mime_type, "image/webp");
        assert_eq!((encoded.width, encoded.height), (40, 20));
        let roundtrip = image::load_from_memory(&encoded.bytes).unwrap();
        assert!(roundtrip.color().has_alpha());
    }

    #[test]
    fn undecodable_bytes_are_an_image_error() {
        let err = transcode(b"not an image", "xl/media/image3.png", 300, 50).unwrap_err();
        assert!(matches!(err, XlstaticError::Image { .. }));
    }

    #[test_case("xl/media/image1.png", "image/png")]
    #[test_case("xl/media/image1.PNG", "image/png")]
    #[test_case("xl/media/image1.gif", "image/jpeg")]
    #[test_case("xl/media/image1", "image/jpeg")]
    fn fallback_mime_types(path: &str, mime: &str) {
        assert_eq!(fallback_mime(path), mime);
    }

    #[test]
    fn data_uri_is_base64() {
        assert_eq!(data_uri("image/png", b"abc"), "data:image/png;base64,YWJj");
    }
}

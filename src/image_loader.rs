//! # Image Loading and Decoding
//!
//! Resolves image references (data URIs, file paths, raw base64) into pixel
//! data the PDF serializer can embed. JPEG bytes pass through untouched and
//! are embedded with DCTDecode. PNG is decoded to RGB with a separate alpha
//! channel for the SMask. Bitmaps above the downscale threshold are decoded
//! and halved once before embedding.
//!
//! The layout engine only sees the [`ImageResolver`] trait, so callers with
//! their own fetch layer (HTTP, a cache, a database) plug in there.

use std::io::Cursor;

use image::imageops::FilterType;
use log::debug;

use crate::error::ProformaError;

/// A fully decoded/loaded image ready for PDF embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded as-is.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels and an optional alpha channel.
    Decoded {
        /// width * height * 3 bytes
        rgb: Vec<u8>,
        /// width * height bytes. None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

impl LoadedImage {
    /// The 1×1 light grey stand-in for an image that failed to load.
    pub fn placeholder() -> Self {
        LoadedImage {
            pixel_data: ImagePixelData::Decoded {
                rgb: vec![230, 230, 230],
                alpha: None,
            },
            width_px: 1,
            height_px: 1,
        }
    }

    /// Size in millimetres when printed at `dpi`.
    pub fn natural_size_mm(&self, dpi: f64) -> (f64, f64) {
        (
            self.width_px as f64 / dpi * 25.4,
            self.height_px as f64 / dpi * 25.4,
        )
    }
}

/// Turns an image reference into pixels.
///
/// Errors are reported as [`ProformaError::ImageFetch`]; the layout engine
/// logs them and draws a placeholder instead.
pub trait ImageResolver {
    fn resolve(&self, src: &str) -> Result<LoadedImage, ProformaError>;
}

impl<F> ImageResolver for F
where
    F: Fn(&str) -> Result<LoadedImage, ProformaError>,
{
    fn resolve(&self, src: &str) -> Result<LoadedImage, ProformaError> {
        self(src)
    }
}

/// The bundled resolver for embedded and local sources.
#[derive(Debug, Clone, Copy)]
pub struct SourceImageResolver {
    /// Images wider or taller than this many pixels are halved.
    pub downscale_threshold: u32,
}

impl Default for SourceImageResolver {
    fn default() -> Self {
        Self {
            downscale_threshold: 1500,
        }
    }
}

impl SourceImageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_downscale_threshold(mut self, px: u32) -> Self {
        self.downscale_threshold = px;
        self
    }
}

impl ImageResolver for SourceImageResolver {
    fn resolve(&self, src: &str) -> Result<LoadedImage, ProformaError> {
        let raw_bytes = read_source_bytes(src).map_err(|e| ProformaError::image(src, e))?;
        let loaded = decode_image_bytes(&raw_bytes).map_err(|e| ProformaError::image(src, e))?;
        if loaded.width_px > self.downscale_threshold || loaded.height_px > self.downscale_threshold
        {
            return downscale_half(&raw_bytes).map_err(|e| ProformaError::image(src, e));
        }
        Ok(loaded)
    }
}

/// Resolve the source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty image reference".to_string());
    }

    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| "Invalid data URI: missing comma".to_string())?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Only explicit path prefixes; base64 text may contain '/'.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src).map_err(|e| format!("Failed to read image file: {}", e));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| format!("Base64 decode error: {}", e))
}

/// Detect image format from magic bytes and decode accordingly.
fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, String> {
    if data.len() < 4 {
        return Err("Image data too short".to_string());
    }

    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) {
        decode_png(data)
    } else {
        Err("Unsupported image format (expected JPEG or PNG)".to_string())
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// JPEG: read dimensions and color space without decoding pixels.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, String> {
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("JPEG format detection error: {}", e))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| format!("Failed to read JPEG dimensions: {}", e))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Scan JPEG markers for the SOF segment and read its component count.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2; // past SOI
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        // length(2) + precision(1) + height(2) + width(2) + components(1)
        if is_sof && i + 9 < data.len() {
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    JpegColorSpace::DeviceRGB
}

/// PNG: decode to RGBA, split into RGB + alpha.
fn decode_png(data: &[u8]) -> Result<LoadedImage, String> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| format!("Failed to decode PNG: {}", e))?;
    Ok(split_rgba(&img))
}

fn split_rgba(img: &image::DynamicImage) -> LoadedImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        has_transparency |= pixel[3] != 255;
    }

    LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: has_transparency.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    }
}

/// Decode any supported format and halve both dimensions.
fn downscale_half(data: &[u8]) -> Result<LoadedImage, String> {
    let img =
        image::load_from_memory(data).map_err(|e| format!("Failed to decode image: {}", e))?;
    let width = (img.width() / 2).max(1);
    let height = (img.height() / 2).max(1);
    debug!(
        "downscaling {}x{} image to {}x{}",
        img.width(),
        img.height(),
        width,
        height
    );
    let resized = img.resize_exact(width, height, FilterType::Triangle);
    Ok(split_rgba(&resized))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(src: &str) -> Result<LoadedImage, ProformaError> {
        SourceImageResolver::default().resolve(src)
    }

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn data_uri(bytes: &[u8]) -> String {
        use base64::Engine;
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn test_is_jpeg() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_jpeg(&[0xFF]));
    }

    #[test]
    fn test_is_png() {
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_png(&[0x89, 0x50]));
    }

    #[test]
    fn test_invalid_data_uri_is_image_error() {
        let err = load("data:image/png;base64").unwrap_err();
        assert!(matches!(err, ProformaError::ImageFetch { .. }));
    }

    #[test]
    fn test_missing_file_is_image_error() {
        let err = load("./definitely/not/here.png").unwrap_err();
        match err {
            ProformaError::ImageFetch { src, reason } => {
                assert_eq!(src, "./definitely/not/here.png");
                assert!(reason.contains("Failed to read"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unsupported_format() {
        assert!(decode_image_bytes(&[0x00, 0x01]).is_err());
        assert!(decode_image_bytes(&[0x00, 0x01, 0x02, 0x03, 0x04]).is_err());
    }

    #[test]
    fn test_decode_opaque_png() {
        let loaded = decode_image_bytes(&png_bytes(1, 1, [255, 0, 0, 255])).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (1, 1));
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none(), "Fully opaque should have no alpha");
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_decode_png_with_alpha() {
        let loaded = decode_image_bytes(&png_bytes(1, 1, [255, 0, 0, 128])).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => {
                assert_eq!(alpha.as_deref(), Some(&[128u8][..]));
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_jpeg_passes_through() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = decode_image_bytes(&buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert_eq!(data, &buf);
                assert_eq!(*color_space, JpegColorSpace::DeviceRGB);
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn test_data_uri_and_raw_base64() {
        let bytes = png_bytes(3, 2, [0, 255, 0, 255]);
        let loaded = load(&data_uri(&bytes)).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (3, 2));

        use base64::Engine;
        let raw = base64::engine::general_purpose::STANDARD.encode(&bytes);
        assert_eq!(load(&raw).unwrap(), loaded);
    }

    #[test]
    fn test_large_images_are_halved() {
        let resolver = SourceImageResolver::new().with_downscale_threshold(8);
        let loaded = resolver
            .resolve(&data_uri(&png_bytes(20, 10, [10, 20, 30, 255])))
            .unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (10, 5));

        let small = resolver
            .resolve(&data_uri(&png_bytes(8, 4, [10, 20, 30, 255])))
            .unwrap();
        assert_eq!((small.width_px, small.height_px), (8, 4));
    }

    #[test]
    fn test_placeholder_and_natural_size() {
        let p = LoadedImage::placeholder();
        assert_eq!((p.width_px, p.height_px), (1, 1));
        let (w, h) = LoadedImage {
            width_px: 96,
            height_px: 48,
            ..p
        }
        .natural_size_mm(96.0);
        assert!((w - 25.4).abs() < 1e-9);
        assert!((h - 12.7).abs() < 1e-9);
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |src: &str| -> Result<LoadedImage, ProformaError> {
            Err(ProformaError::image(src, "offline"))
        };
        assert!(resolver.resolve("https://example.com/a.png").is_err());
    }
}

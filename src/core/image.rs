//! Raster image decoding.
//!
//! Images arrive as raw multimedia resource bytes. The format is sniffed from
//! the header and decoded with a specialized decoder:
//! - zune-jpeg for JPEG - fast and SIMD-optimized
//! - the `image` crate for PNG, BMP and GIF
//!
//! Every decoder normalizes to 8-bit RGBA so devices only ever see one layout.

use super::error::{RenderError, RenderResult};

/// Mask pixels whose mean channel value is above this keep the image pixel.
const MASK_WHITE_LEVEL: u16 = 244;

/// Image formats recognized in multimedia resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    JPEG,
    PNG,
    BMP,
    GIF,
    Unknown,
}

impl ImageFormat {
    /// Detect image format from header bytes
    pub fn from_header(header: &[u8]) -> Self {
        if header.len() < 4 {
            return ImageFormat::Unknown;
        }

        // JPEG signature: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return ImageFormat::JPEG;
        }

        // PNG signature: 89 50 4E 47
        if header.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return ImageFormat::PNG;
        }

        if header.starts_with(b"BM") {
            return ImageFormat::BMP;
        }

        if header.starts_with(b"GIF8") {
            return ImageFormat::GIF;
        }

        ImageFormat::Unknown
    }
}

/// Decoded 8-bit RGBA pixels (straight alpha, row-major, no padding).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl DecodedImage {
    /// Wrap RGBA pixels, checking the buffer size.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> RenderResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(RenderError::ImageDecode(format!(
                "expected {}x{} RGBA ({} bytes), got {} bytes",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(DecodedImage {
            width,
            height,
            data,
        })
    }

    /// Expand interleaved gray, gray+alpha, RGB or RGBA samples to RGBA.
    pub fn from_channels(width: u32, height: u32, channels: usize, data: &[u8]) -> RenderResult<Self> {
        let pixels = width as usize * height as usize;
        if channels == 0 || data.len() < pixels * channels {
            return Err(RenderError::ImageDecode(format!(
                "insufficient pixel data: {} channels for {}x{}, got {} bytes",
                channels,
                width,
                height,
                data.len()
            )));
        }

        let mut rgba = Vec::with_capacity(pixels * 4);
        for px in data.chunks_exact(channels).take(pixels) {
            match channels {
                1 => rgba.extend_from_slice(&[px[0], px[0], px[0], 255]),
                2 => rgba.extend_from_slice(&[px[0], px[0], px[0], px[1]]),
                3 => rgba.extend_from_slice(&[px[0], px[1], px[2], 255]),
                4 => rgba.extend_from_slice(px),
                n => {
                    return Err(RenderError::Unsupported {
                        feature: format!("{} channel images", n),
                    });
                }
            }
        }
        Self::from_rgba(width, height, rgba)
    }

    /// Make every pixel transparent where `mask` is not white.
    ///
    /// A mask of a different size leaves the image untouched and returns
    /// `false`.
    pub fn apply_mask(&mut self, mask: &DecodedImage) -> bool {
        if (self.width, self.height) != (mask.width, mask.height) {
            return false;
        }
        for (px, m) in self.data.chunks_exact_mut(4).zip(mask.data.chunks_exact(4)) {
            let level = (u16::from(m[0]) + u16::from(m[1]) + u16::from(m[2])) / 3;
            if level <= MASK_WHITE_LEVEL {
                px[3] = 0;
            }
        }
        true
    }
}

/// Image decoder dispatching on the sniffed format.
pub struct ImageDecoder;

impl ImageDecoder {
    /// Detect the format and decode.
    pub fn decode(data: &[u8]) -> RenderResult<DecodedImage> {
        Self::decode_image(data, ImageFormat::from_header(data))
    }

    /// Decode image data using the appropriate decoder
    pub fn decode_image(data: &[u8], format: ImageFormat) -> RenderResult<DecodedImage> {
        match format {
            ImageFormat::JPEG => Self::decode_jpeg(data),
            ImageFormat::PNG => Self::decode_png(data),
            ImageFormat::BMP | ImageFormat::GIF => Self::decode_bitmap(data, format),
            ImageFormat::Unknown => Err(RenderError::Unsupported {
                feature: "Unknown image format".to_string(),
            }),
        }
    }

    /// Decode JPEG image using zune-jpeg
    #[cfg(feature = "jpeg-decoding")]
    fn decode_jpeg(data: &[u8]) -> RenderResult<DecodedImage> {
        use std::io::Cursor;
        use zune_jpeg::zune_core::colorspace::ColorSpace;
        use zune_jpeg::zune_core::options::DecoderOptions;

        let options = DecoderOptions::default()
            .set_max_width(u16::MAX as usize)
            .set_max_height(u16::MAX as usize)
            .jpeg_set_out_colorspace(ColorSpace::RGBA);

        let mut decoder = zune_jpeg::JpegDecoder::new_with_options(Cursor::new(data), options);

        decoder
            .decode_headers()
            .map_err(|e| RenderError::ImageDecode(format!("JPEG header decode error: {:?}", e)))?;

        let info = decoder
            .info()
            .ok_or_else(|| RenderError::ImageDecode("Failed to get JPEG info".to_string()))?;

        let width = info.width as u32;
        let height = info.height as u32;

        let pixels = decoder
            .decode()
            .map_err(|e| RenderError::ImageDecode(format!("JPEG decode error: {:?}", e)))?;

        let channels = pixels.len() / (width as usize * height as usize).max(1);
        DecodedImage::from_channels(width, height, channels, &pixels)
    }

    #[cfg(not(feature = "jpeg-decoding"))]
    fn decode_jpeg(_data: &[u8]) -> RenderResult<DecodedImage> {
        Err(RenderError::Unsupported {
            feature: "JPEG decoding not enabled. Enable the 'jpeg-decoding' feature.".to_string(),
        })
    }

    /// Decode PNG image using the image crate
    #[cfg(feature = "png-decoding")]
    fn decode_png(data: &[u8]) -> RenderResult<DecodedImage> {
        let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png)
            .map_err(|e| RenderError::ImageDecode(format!("PNG decode error: {:?}", e)))?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        DecodedImage::from_rgba(width, height, rgba.into_raw())
    }

    #[cfg(not(feature = "png-decoding"))]
    fn decode_png(_data: &[u8]) -> RenderResult<DecodedImage> {
        Err(RenderError::Unsupported {
            feature: "PNG decoding not enabled. Enable the 'png-decoding' feature.".to_string(),
        })
    }

    /// Decode BMP or GIF (first frame) using the image crate
    #[cfg(feature = "bitmap-decoding")]
    fn decode_bitmap(data: &[u8], format: ImageFormat) -> RenderResult<DecodedImage> {
        let image_format = match format {
            ImageFormat::GIF => image::ImageFormat::Gif,
            _ => image::ImageFormat::Bmp,
        };
        let decoded = image::load_from_memory_with_format(data, image_format)
            .map_err(|e| RenderError::ImageDecode(format!("{:?} decode error: {:?}", format, e)))?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        DecodedImage::from_rgba(width, height, rgba.into_raw())
    }

    #[cfg(not(feature = "bitmap-decoding"))]
    fn decode_bitmap(_data: &[u8], format: ImageFormat) -> RenderResult<DecodedImage> {
        Err(RenderError::Unsupported {
            feature: format!(
                "{:?} decoding not enabled. Enable the 'bitmap-decoding' feature.",
                format
            ),
        })
    }
}

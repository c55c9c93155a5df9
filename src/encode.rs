//! Still-image encoding.
//!
//! The sampled surface is encoded losslessly to PNG. Encoding is CPU-bound,
//! so the extractor runs [`encode_png`] on a blocking worker.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::FramegrabError;

/// Encoding of an extracted still.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ImageEncoding {
    /// Portable Network Graphics (lossless).
    #[default]
    Png,
}

impl ImageEncoding {
    /// MIME type of the encoded bytes.
    pub fn media_type(self) -> &'static str {
        match self {
            ImageEncoding::Png => "image/png",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::Png => "png",
        }
    }
}

impl Display for ImageEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.media_type())
    }
}

/// Encode `surface` as PNG.
///
/// # Errors
///
/// Returns [`FramegrabError::EncodeError`] if the encoder fails or produces
/// no bytes.
pub fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>, FramegrabError> {
    let mut cursor = Cursor::new(Vec::new());
    surface
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|error| FramegrabError::EncodeError(error.to_string()))?;

    let bytes = cursor.into_inner();
    if bytes.is_empty() {
        return Err(FramegrabError::EncodeError(
            "PNG encoder produced no data".to_string(),
        ));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn encodes_decodable_png() {
        let surface = RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255]));
        let bytes = encode_png(&surface).expect("encode");

        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .expect("decode")
            .to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.get_pixel(3, 2), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn encoding_metadata() {
        assert_eq!(ImageEncoding::Png.media_type(), "image/png");
        assert_eq!(ImageEncoding::Png.extension(), "png");
    }
}

//! Raster surface allocation.
//!
//! The surface is an RGBA8 buffer sized to the stream's natural dimensions.
//! It is allocated per extraction once metadata is known and never reused
//! across calls.

use image::RgbaImage;

use crate::error::FramegrabError;

/// Bytes per RGBA8 pixel.
pub(crate) const BYTES_PER_PIXEL: usize = 4;

/// Allocate a blank surface of `width` x `height`.
///
/// # Errors
///
/// Returns [`FramegrabError::SurfaceUnavailable`] if either dimension is
/// zero, exceeds `max_dimension`, or the buffer size overflows `usize`.
pub(crate) fn allocate(
    width: u32,
    height: u32,
    max_dimension: u32,
) -> Result<RgbaImage, FramegrabError> {
    let unavailable = FramegrabError::SurfaceUnavailable { width, height };

    if width == 0 || height == 0 || width > max_dimension || height > max_dimension {
        return Err(unavailable);
    }

    let byte_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL));
    if byte_len.is_none() {
        return Err(unavailable);
    }

    Ok(RgbaImage::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sized_to_natural_dimensions() {
        let surface = allocate(640, 480, 16_384).expect("surface");
        assert_eq!(surface.dimensions(), (640, 480));
    }

    #[test]
    fn zero_dimensions_are_unavailable() {
        assert!(matches!(
            allocate(0, 480, 16_384),
            Err(FramegrabError::SurfaceUnavailable { width: 0, height: 480 })
        ));
    }

    #[test]
    fn oversized_frames_are_unavailable() {
        assert!(matches!(
            allocate(20_000, 10, 16_384),
            Err(FramegrabError::SurfaceUnavailable { .. })
        ));
    }
}

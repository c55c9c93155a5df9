//! Stream metadata.
//!
//! [`StreamMetadata`] is what the metadata-ready step reports: the natural
//! dimensions that size the raster surface and the duration that the
//! last-frame seek target is computed from.

use std::time::Duration;

/// Metadata for the video stream being extracted from.
///
/// # Example
///
/// ```no_run
/// use framegrab::{FrameExtractor, FramegrabError, VideoSource};
///
/// # async fn example() -> Result<(), FramegrabError> {
/// let extractor = FrameExtractor::new();
/// let metadata = extractor.probe(&VideoSource::open("input.mp4")?).await?;
/// println!("{}x{}, {:?}", metadata.width, metadata.height, metadata.duration);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct StreamMetadata {
    /// Natural frame width in pixels.
    pub width: u32,
    /// Natural frame height in pixels.
    pub height: u32,
    /// Total duration, or `None` when neither the container nor the stream
    /// reports one (common for live-recorded WebM).
    pub duration: Option<Duration>,
    /// Frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

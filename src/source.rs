//! Video sources and media-type sniffing.
//!
//! A [`VideoSource`] is the caller-owned input to an extraction: raw bytes
//! plus a declared media type. Only types starting with `video/` are
//! accepted, and the check happens when the source is built, so a non-video
//! input never reaches the extractor.
//!
//! # Example
//!
//! ```no_run
//! use framegrab::{FramegrabError, VideoSource};
//!
//! let source = VideoSource::open("clip.mp4")?;
//! assert_eq!(source.media_type(), "video/mp4");
//! # Ok::<(), FramegrabError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

use crate::error::FramegrabError;

/// Fallback type for content nothing could be sniffed from.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extension to media-type table used by [`sniff_media_type`].
const EXTENSION_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("ogv", "video/ogg"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("3gp", "video/3gpp"),
    ("flv", "video/x-flv"),
    ("wmv", "video/x-ms-wmv"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("flac", "audio/flac"),
    ("txt", "text/plain"),
];

/// Binary video content plus its declared media type.
///
/// The bytes are shared behind an [`Arc`], so handing a source to the
/// extractor's decode worker is cheap and never mutates the caller's copy.
#[derive(Clone)]
pub struct VideoSource {
    bytes: Arc<[u8]>,
    media_type: String,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl VideoSource {
    /// Wrap in-memory bytes with a declared media type.
    ///
    /// # Errors
    ///
    /// Returns [`FramegrabError::UnsupportedMediaType`] unless `media_type`
    /// starts with `video/` (case-insensitive).
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        media_type: impl Into<String>,
    ) -> Result<Self, FramegrabError> {
        let media_type = media_type.into().trim().to_ascii_lowercase();
        if !is_video_type(&media_type) {
            return Err(FramegrabError::UnsupportedMediaType(media_type));
        }
        Ok(Self {
            bytes: bytes.into(),
            media_type,
        })
    }

    /// Read a file and sniff its media type.
    ///
    /// # Errors
    ///
    /// Returns [`FramegrabError::IoError`] if the file cannot be read, or
    /// [`FramegrabError::UnsupportedMediaType`] if it does not look like a
    /// video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FramegrabError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let media_type = sniff_media_type(path, &bytes);
        log::debug!(
            "Read {} ({} bytes, sniffed as {media_type})",
            path.display(),
            bytes.len()
        );
        Self::new(bytes, media_type)
    }

    /// Raw content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared media type, lower-cased.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Size of the content in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the content is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Preferred file extension for this source's media type, if known.
    pub fn extension(&self) -> Option<&'static str> {
        EXTENSION_TYPES
            .iter()
            .find(|(_, media_type)| *media_type == self.media_type)
            .map(|(extension, _)| *extension)
    }
}

/// Returns `true` if `media_type` names a video type.
pub fn is_video_type(media_type: &str) -> bool {
    media_type
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("video/"))
}

/// Guess a media type from a file name, falling back to the leading bytes.
pub fn sniff_media_type(path: &Path, bytes: &[u8]) -> &'static str {
    path.extension()
        .and_then(|extension| extension.to_str())
        .and_then(|extension| {
            EXTENSION_TYPES
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(extension))
                .map(|(_, media_type)| *media_type)
        })
        .or_else(|| sniff_magic(bytes))
        .unwrap_or(OCTET_STREAM)
}

/// Recognise a handful of container signatures.
fn sniff_magic(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return Some(match &bytes[8..12] {
            b"qt  " => "video/quicktime",
            b"3gp4" | b"3gp5" | b"3gp6" => "video/3gpp",
            _ => "video/mp4",
        });
    }
    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some("video/webm");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"AVI " {
        return Some("video/x-msvideo");
    }
    if bytes.starts_with(b"OggS") {
        return Some("video/ogg");
    }
    if bytes.starts_with(b"FLV") {
        return Some("video/x-flv");
    }
    if bytes.starts_with(&[0x00, 0x00, 0x01, 0xBA]) {
        return Some("video/mpeg");
    }
    if bytes.starts_with(b"\x89PNG") {
        return Some("image/png");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_video_types() {
        let result = VideoSource::new(vec![1, 2, 3], "image/png");
        assert!(matches!(
            result,
            Err(FramegrabError::UnsupportedMediaType(ref kind)) if kind == "image/png"
        ));
    }

    #[test]
    fn accepts_video_types_case_insensitively() {
        let source = VideoSource::new(vec![0_u8; 4], "Video/MP4").expect("video type");
        assert_eq!(source.media_type(), "video/mp4");
        assert_eq!(source.extension(), Some("mp4"));
        assert_eq!(source.len(), 4);
    }

    #[test]
    fn sniffs_by_extension_first() {
        let media_type = sniff_media_type(Path::new("clip.WEBM"), b"not really");
        assert_eq!(media_type, "video/webm");
    }

    #[test]
    fn sniffs_magic_when_extension_is_missing() {
        let mut header = vec![0_u8, 0, 0, 0x20];
        header.extend_from_slice(b"ftypisom");
        assert_eq!(sniff_media_type(Path::new("upload"), &header), "video/mp4");
        assert_eq!(
            sniff_media_type(Path::new("upload"), b"plain text"),
            OCTET_STREAM
        );
    }

    #[test]
    fn clones_share_content() {
        let source = VideoSource::new(vec![7_u8; 16], "video/webm").expect("video type");
        let clone = source.clone();
        assert!(std::ptr::eq(source.bytes().as_ptr(), clone.bytes().as_ptr()));
    }
}

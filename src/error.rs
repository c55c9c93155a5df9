//! Error types for the `framegrab` crate.
//!
//! This module defines [`FramegrabError`], the unified error type returned by
//! every fallible operation in the crate. The four extraction failures
//! ([`SurfaceUnavailable`](FramegrabError::SurfaceUnavailable),
//! [`DecodeError`](FramegrabError::DecodeError),
//! [`SeekTimeout`](FramegrabError::SeekTimeout) and
//! [`EncodeError`](FramegrabError::EncodeError)) are terminal for the call
//! that produced them; nothing is retried automatically.

use std::{io::Error as IoError, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::position::SeekTarget;

/// The unified error type for all `framegrab` operations.
///
/// Variants carry enough context to diagnose the problem without additional
/// logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramegrabError {
    /// The declared media type is not a video type.
    ///
    /// Raised by [`VideoSource`](crate::VideoSource) constructors, before any
    /// extraction starts.
    #[error("Unsupported media type {0:?}: expected a type starting with \"video/\"")]
    UnsupportedMediaType(String),

    /// A raster surface for the decoded frame could not be allocated.
    #[error("Rendering surface unavailable for a {width}x{height} frame")]
    SurfaceUnavailable {
        /// Natural width reported by the decoder.
        width: u32,
        /// Natural height reported by the decoder.
        height: u32,
    },

    /// The source could not be opened or decoded, or its metadata never
    /// became available.
    #[error("Failed to decode video: {0}")]
    DecodeError(String),

    /// The decoder did not finish seeking within the configured bound.
    #[error("Seek to {target} did not complete within {waited:?}")]
    SeekTimeout {
        /// The position that was requested.
        target: SeekTarget,
        /// How long the extractor waited before giving up.
        waited: Duration,
    },

    /// The sampled frame could not be encoded to a still image.
    #[error("Failed to encode frame: {0}")]
    EncodeError(String),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error occurred while reading a source or writing an image.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for FramegrabError {
    fn from(error: FfmpegError) -> Self {
        FramegrabError::DecodeError(error.to_string())
    }
}

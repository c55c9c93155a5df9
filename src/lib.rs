//! # framegrab
//!
//! Grab the first or last frame of a video as a PNG still.
//!
//! `framegrab` takes a video (bytes plus a declared `video/*` media type),
//! decodes it with FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, seeks to the
//! first or last displayable frame, and returns it as a PNG behind a
//! revocable, addressable handle.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framegrab::{FrameExtractor, FramePosition, FramegrabError, VideoSource};
//!
//! # async fn example() -> Result<(), FramegrabError> {
//! let extractor = FrameExtractor::new();
//! let source = VideoSource::open("input.mp4")?;
//!
//! let first = extractor.extract(&source, FramePosition::First).await?;
//! first.save_to_dir(".")?; // writes first-frame.png
//! # Ok(())
//! # }
//! ```
//!
//! ## How an extraction runs
//!
//! Each call walks `MetadataPending → Seeking → FrameReady → Encoding → Done`.
//! Metadata loading and seeking are awaited with a bound
//! ([`ExtractOptions::with_metadata_timeout`],
//! [`ExtractOptions::with_seek_timeout`]), so broken inputs settle as
//! [`FramegrabError::DecodeError`] or [`FramegrabError::SeekTimeout`] instead
//! of hanging. The last frame is requested slightly before the reported
//! duration (see [`ExtractOptions::with_last_frame_epsilon`]); when no
//! duration is reported, the stream is decoded to its end instead.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on the system, and the
//! extractor must be awaited inside a multi-threaded or current-thread Tokio
//! runtime (decode work runs on its blocking pool). The runtime needs its
//! time driver: build it with `enable_time()` or `enable_all()`
//! (`#[tokio::main]` and `#[tokio::test]` do this). The step timeouts panic
//! on a runtime without one.
//!
//! ```no_run
//! use framegrab::{FrameExtractor, FramePosition, VideoSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()?;
//!
//! let source = VideoSource::open("input.mp4")?;
//! let frame = runtime.block_on(FrameExtractor::new().extract(&source, FramePosition::First))?;
//! frame.save_to_dir(".")?;
//! # Ok(())
//! # }
//! ```

pub mod configuration;
mod conversion;
pub mod decoder;
pub mod encode;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod handle;
pub mod metadata;
pub mod position;
pub mod progress;
pub mod source;
mod surface;

pub use configuration::ExtractOptions;
pub use decoder::{DecodeBackend, DecodeContext, FfmpegBackend};
pub use encode::{ImageEncoding, encode_png};
pub use error::FramegrabError;
pub use extractor::{ExtractedFrame, FrameExtractor};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use handle::{FrameHandle, HandleRegistry};
pub use metadata::StreamMetadata;
pub use position::{FramePosition, SeekTarget};
pub use progress::{CancellationToken, ExtractionState, ProgressCallback, ProgressInfo};
pub use source::{VideoSource, is_video_type, sniff_media_type};

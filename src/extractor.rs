//! The frame-extraction pipeline.
//!
//! [`FrameExtractor::extract`] drives one extraction through
//! `MetadataPending → Seeking → FrameReady → Encoding → Done`. Each
//! suspension point is a single awaited step: the blocking decode work runs
//! on tokio's blocking pool and the await is bounded, so a source that never
//! yields metadata or a seek that never lands settles as an error instead
//! of hanging.
//!
//! # Example
//!
//! ```no_run
//! use framegrab::{FrameExtractor, FramePosition, FramegrabError, VideoSource};
//!
//! # async fn example() -> Result<(), FramegrabError> {
//! let extractor = FrameExtractor::new();
//! let source = VideoSource::open("input.mp4")?;
//!
//! let frame = extractor.extract(&source, FramePosition::Last).await?;
//! println!("{}x{} at {}", frame.width(), frame.height(), frame.url());
//! frame.save_to_dir(".")?;
//! # Ok(())
//! # }
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::{
    configuration::ExtractOptions,
    decoder::{DecodeBackend, DecodeContext, FfmpegBackend},
    encode::{ImageEncoding, encode_png},
    error::FramegrabError,
    handle::{FrameHandle, HandleRegistry},
    metadata::StreamMetadata,
    position::{FramePosition, SeekTarget},
    progress::{ExtractionState, StateTracker},
    source::VideoSource,
    surface,
};

/// A successfully extracted still.
///
/// Owns a [`FrameHandle`]; the handle's URL stays resolvable through the
/// extractor's [`HandleRegistry`] until this value is revoked or dropped.
pub struct ExtractedFrame {
    position: FramePosition,
    seek_target: SeekTarget,
    metadata: StreamMetadata,
    encoding: ImageEncoding,
    handle: FrameHandle,
}

impl Debug for ExtractedFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractedFrame")
            .field("position", &self.position)
            .field("width", &self.metadata.width)
            .field("height", &self.metadata.height)
            .field("seek_target", &self.seek_target)
            .field("encoding", &self.encoding)
            .field("handle", &self.handle)
            .finish()
    }
}

impl ExtractedFrame {
    /// Which frame this is.
    pub fn position(&self) -> FramePosition {
        self.position
    }

    /// Image width in pixels (the stream's natural width).
    pub fn width(&self) -> u32 {
        self.metadata.width
    }

    /// Image height in pixels (the stream's natural height).
    pub fn height(&self) -> u32 {
        self.metadata.height
    }

    /// Where the decoder was asked to seek to.
    pub fn seek_target(&self) -> SeekTarget {
        self.seek_target
    }

    /// Metadata of the stream the frame came from.
    pub fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    /// Encoding of [`bytes`](ExtractedFrame::bytes).
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    /// Encoded image bytes.
    pub fn bytes(&self) -> &[u8] {
        self.handle.bytes()
    }

    /// Addressable URL of the underlying handle.
    pub fn url(&self) -> &str {
        self.handle.url()
    }

    /// Download name: `<position>-frame.png`.
    pub fn file_name(&self) -> String {
        self.position.file_name()
    }

    /// Decode the encoded bytes back into an image.
    pub fn to_image(&self) -> Result<DynamicImage, FramegrabError> {
        Ok(image::load_from_memory_with_format(
            self.bytes(),
            ImageFormat::Png,
        )?)
    }

    /// Write the encoded bytes to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FramegrabError> {
        std::fs::write(path, self.bytes())?;
        Ok(())
    }

    /// Write the image into `directory` under [`file_name`](ExtractedFrame::file_name)
    /// and return the full path.
    pub fn save_to_dir<P: AsRef<Path>>(&self, directory: P) -> Result<PathBuf, FramegrabError> {
        let path = directory.as_ref().join(self.file_name());
        self.save(&path)?;
        Ok(path)
    }

    /// Give up the frame metadata and keep only the handle.
    pub fn into_handle(self) -> FrameHandle {
        self.handle
    }

    /// Release the handle now. Equivalent to dropping the frame.
    pub fn revoke(self) {
        self.handle.revoke();
    }
}

/// Why an awaited blocking step produced no value.
enum StepFailure {
    Failed(FramegrabError),
    TimedOut(Duration),
    Aborted(String),
}

/// Run `work` on the blocking pool and await it, bounded by `limit`.
///
/// On timeout the worker is abandoned, not preempted: whatever it owns is
/// dropped when it eventually returns.
async fn await_blocking<T, F>(limit: Option<Duration>, work: F) -> Result<T, StepFailure>
where
    F: FnOnce() -> Result<T, FramegrabError> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    let joined = match limit {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => return Err(StepFailure::TimedOut(limit)),
        },
        None => task.await,
    };

    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(StepFailure::Failed(error)),
        Err(join_error) => Err(StepFailure::Aborted(join_error.to_string())),
    }
}

/// Extracts the first or last frame of a video as a PNG still.
///
/// Cheap to share behind a reference; every call builds its own decode
/// context and surface, so calls never share decoder state. Callers that
/// drive a UI should still serialize calls per source.
pub struct FrameExtractor {
    backend: Arc<dyn DecodeBackend>,
    registry: HandleRegistry,
    options: ExtractOptions,
}

impl Debug for FrameExtractor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameExtractor")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExtractor {
    /// FFmpeg-backed extractor with default options.
    pub fn new() -> Self {
        Self::with_options(ExtractOptions::new())
    }

    /// FFmpeg-backed extractor with custom options.
    pub fn with_options(options: ExtractOptions) -> Self {
        Self::with_backend(Arc::new(FfmpegBackend::new()), options)
    }

    /// Extractor over any [`DecodeBackend`].
    pub fn with_backend(backend: Arc<dyn DecodeBackend>, options: ExtractOptions) -> Self {
        Self {
            backend,
            registry: HandleRegistry::new(),
            options,
        }
    }

    /// The registry that resolves the URLs of extracted frames.
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Options this extractor was built with.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Load the source's stream metadata without extracting anything.
    ///
    /// # Errors
    ///
    /// [`FramegrabError::DecodeError`] if the source cannot be opened or
    /// metadata does not arrive within the metadata timeout.
    pub async fn probe(&self, source: &VideoSource) -> Result<StreamMetadata, FramegrabError> {
        let (_context, metadata) = self.load_metadata(source).await?;
        Ok(metadata)
    }

    /// Extract the frame at `position`.
    ///
    /// Exactly one result is produced per call. On success the caller owns
    /// the returned frame and its handle; on failure nothing is registered.
    ///
    /// # Errors
    ///
    /// - [`FramegrabError::DecodeError`] if the source cannot be decoded or
    ///   metadata never arrives.
    /// - [`FramegrabError::SurfaceUnavailable`] if no surface fits the frame.
    /// - [`FramegrabError::SeekTimeout`] if the seek does not complete in time.
    /// - [`FramegrabError::EncodeError`] if PNG encoding yields nothing.
    /// - [`FramegrabError::Cancelled`] if the configured token was cancelled.
    ///
    /// # Panics
    ///
    /// If awaited on a Tokio runtime built without its time driver.
    pub async fn extract(
        &self,
        source: &VideoSource,
        position: FramePosition,
    ) -> Result<ExtractedFrame, FramegrabError> {
        let mut tracker = StateTracker::new(Arc::clone(&self.options.progress), position);
        let result = self.run_pipeline(source, position, &mut tracker).await;

        match &result {
            Ok(frame) => log::info!(
                "Extracted {position} frame: {}x{} at {} -> {}",
                frame.width(),
                frame.height(),
                frame.seek_target(),
                frame.url(),
            ),
            Err(error) => {
                log::warn!(
                    "Extracting {position} frame failed in {:?}: {error}",
                    tracker.state()
                );
                tracker.fail();
            }
        }
        result
    }

    async fn run_pipeline(
        &self,
        source: &VideoSource,
        position: FramePosition,
        tracker: &mut StateTracker,
    ) -> Result<ExtractedFrame, FramegrabError> {
        self.checkpoint()?;
        tracker.advance(ExtractionState::MetadataPending);
        let (context, metadata) = self.load_metadata(source).await?;

        let surface = surface::allocate(
            metadata.width,
            metadata.height,
            self.options.max_surface_dimension,
        )?;

        let target = position.seek_target(metadata.duration, self.options.last_frame_epsilon);
        if target == SeekTarget::EndOfStream {
            log::info!("Source reports no duration; decoding to the end for the last frame");
        }
        tracker.set_seek_target(target);

        self.checkpoint()?;
        tracker.advance(ExtractionState::Seeking);
        let context = self.seek(context, target).await?;

        tracker.advance(ExtractionState::FrameReady);
        let surface = Self::sample(context, surface).await?;

        self.checkpoint()?;
        tracker.advance(ExtractionState::Encoding);
        let png = Self::encode(surface).await?;

        let handle = self.registry.register(png);
        tracker.advance(ExtractionState::Done);

        Ok(ExtractedFrame {
            position,
            seek_target: target,
            metadata,
            encoding: ImageEncoding::Png,
            handle,
        })
    }

    /// Open the source and wait for its metadata.
    async fn load_metadata(
        &self,
        source: &VideoSource,
    ) -> Result<(Box<dyn DecodeContext>, StreamMetadata), FramegrabError> {
        let backend = Arc::clone(&self.backend);
        let source = source.clone();
        let limit = self.options.metadata_timeout;

        await_blocking(Some(limit), move || {
            let mut context = backend.open(&source)?;
            let metadata = context.load_metadata()?;
            Ok((context, metadata))
        })
        .await
        .map_err(|failure| match failure {
            StepFailure::Failed(error) => error,
            StepFailure::TimedOut(waited) => FramegrabError::DecodeError(format!(
                "metadata not available within {waited:?}"
            )),
            StepFailure::Aborted(reason) => {
                FramegrabError::DecodeError(format!("decode worker stopped: {reason}"))
            }
        })
    }

    /// Seek and wait until the decoder has the target frame.
    async fn seek(
        &self,
        mut context: Box<dyn DecodeContext>,
        target: SeekTarget,
    ) -> Result<Box<dyn DecodeContext>, FramegrabError> {
        await_blocking(Some(self.options.seek_timeout), move || {
            context.seek(target)?;
            Ok(context)
        })
        .await
        .map_err(|failure| match failure {
            StepFailure::Failed(error) => error,
            StepFailure::TimedOut(waited) => FramegrabError::SeekTimeout { target, waited },
            StepFailure::Aborted(reason) => {
                FramegrabError::DecodeError(format!("seek worker stopped: {reason}"))
            }
        })
    }

    /// Draw the located frame into the surface. The context is released here.
    async fn sample(
        mut context: Box<dyn DecodeContext>,
        mut surface: RgbaImage,
    ) -> Result<RgbaImage, FramegrabError> {
        await_blocking(None, move || {
            context.sample(&mut surface)?;
            Ok(surface)
        })
        .await
        .map_err(|failure| match failure {
            StepFailure::Failed(error) => error,
            StepFailure::TimedOut(_) | StepFailure::Aborted(_) => {
                FramegrabError::DecodeError("sampling worker stopped".to_string())
            }
        })
    }

    async fn encode(surface: RgbaImage) -> Result<Vec<u8>, FramegrabError> {
        await_blocking(None, move || encode_png(&surface))
            .await
            .map_err(|failure| match failure {
                StepFailure::Failed(error) => error,
                StepFailure::TimedOut(_) => {
                    FramegrabError::EncodeError("encoder timed out".to_string())
                }
                StepFailure::Aborted(reason) => {
                    FramegrabError::EncodeError(format!("encoder worker stopped: {reason}"))
                }
            })
    }

    fn checkpoint(&self) -> Result<(), FramegrabError> {
        if self.options.is_cancelled() {
            return Err(FramegrabError::Cancelled);
        }
        Ok(())
    }
}

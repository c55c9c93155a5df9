//! Extraction options.
//!
//! [`ExtractOptions`] is a builder that threads timeouts, the last-frame
//! epsilon, surface limits, progress callbacks, and cancellation tokens
//! through the extractor without widening every signature.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use framegrab::{CancellationToken, ExtractOptions};
//!
//! let token = CancellationToken::new();
//! let options = ExtractOptions::new()
//!     .with_seek_timeout(Duration::from_secs(2))
//!     .with_last_frame_epsilon(Duration::from_millis(50))
//!     .with_cancellation(token.clone());
//! assert_eq!(options.last_frame_epsilon(), Duration::from_millis(50));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default bound on the metadata-ready step.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on the seek step.
pub const DEFAULT_SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default offset subtracted from the duration when seeking to the last frame.
pub const DEFAULT_LAST_FRAME_EPSILON: Duration = Duration::from_millis(100);

/// Smallest epsilon accepted; keeps the last-frame target strictly before
/// end-of-stream.
pub const MIN_LAST_FRAME_EPSILON: Duration = Duration::from_millis(1);

/// Default largest width or height a surface may have.
pub const DEFAULT_MAX_SURFACE_DIMENSION: u32 = 16_384;

/// Configuration for extraction operations.
///
/// A default-constructed value uses the `DEFAULT_*` constants, a no-op
/// progress callback, and no cancellation.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) metadata_timeout: Duration,
    pub(crate) seek_timeout: Duration,
    pub(crate) last_frame_epsilon: Duration,
    pub(crate) max_surface_dimension: u32,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("metadata_timeout", &self.metadata_timeout)
            .field("seek_timeout", &self.seek_timeout)
            .field("last_frame_epsilon", &self.last_frame_epsilon)
            .field("max_surface_dimension", &self.max_surface_dimension)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            seek_timeout: DEFAULT_SEEK_TIMEOUT,
            last_frame_epsilon: DEFAULT_LAST_FRAME_EPSILON,
            max_surface_dimension: DEFAULT_MAX_SURFACE_DIMENSION,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Bound the wait for container metadata. Expiry fails the call with
    /// [`DecodeError`](crate::FramegrabError::DecodeError).
    #[must_use]
    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Bound the wait for the decoder to land on the target frame. Expiry
    /// fails the call with [`SeekTimeout`](crate::FramegrabError::SeekTimeout).
    #[must_use]
    pub fn with_seek_timeout(mut self, timeout: Duration) -> Self {
        self.seek_timeout = timeout;
        self
    }

    /// Set the offset subtracted from the duration for last-frame seeks.
    ///
    /// Clamped to at least [`MIN_LAST_FRAME_EPSILON`].
    #[must_use]
    pub fn with_last_frame_epsilon(mut self, epsilon: Duration) -> Self {
        self.last_frame_epsilon = epsilon.max(MIN_LAST_FRAME_EPSILON);
        self
    }

    /// Largest width or height a raster surface may have. Larger frames fail
    /// with [`SurfaceUnavailable`](crate::FramegrabError::SurfaceUnavailable).
    #[must_use]
    pub fn with_max_surface_dimension(mut self, dimension: u32) -> Self {
        self.max_surface_dimension = dimension;
        self
    }

    /// Attach a progress callback, invoked at every state transition.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Configured metadata timeout.
    pub fn metadata_timeout(&self) -> Duration {
        self.metadata_timeout
    }

    /// Configured seek timeout.
    pub fn seek_timeout(&self) -> Duration {
        self.seek_timeout
    }

    /// Configured last-frame epsilon.
    pub fn last_frame_epsilon(&self) -> Duration {
        self.last_frame_epsilon
    }

    /// Configured surface limit.
    pub fn max_surface_dimension(&self) -> u32 {
        self.max_surface_dimension
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

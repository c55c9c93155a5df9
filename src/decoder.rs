//! Decode backends.
//!
//! The extractor talks to the media pipeline through two traits:
//! [`DecodeBackend`] opens a [`VideoSource`] into a fresh
//! [`DecodeContext`], and the context performs the three blocking steps
//! the pipeline awaits: loading metadata, seeking, and sampling the decoded
//! frame into a surface. [`FfmpegBackend`] is the production implementation.
//!
//! Contexts are created per extraction and dropped when it ends; nothing is
//! shared between calls.

use std::io::Write;
use std::time::Duration;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbaImage;
use tempfile::NamedTempFile;

use crate::{
    conversion::{
        container_duration, duration_to_seek_timestamp, frame_to_buffer, pts_to_seconds,
        rational_to_fps, stream_duration,
    },
    error::FramegrabError,
    metadata::StreamMetadata,
    position::SeekTarget,
    source::VideoSource,
    surface::BYTES_PER_PIXEL,
};

/// Opens sources into decode contexts.
pub trait DecodeBackend: Send + Sync {
    /// Attach `source` for decoding.
    ///
    /// Runs on a blocking worker. Must not read the stream beyond what is
    /// needed to open it.
    fn open(&self, source: &VideoSource) -> Result<Box<dyn DecodeContext>, FramegrabError>;
}

/// One source attached for decoding.
///
/// Each method is a blocking step; the extractor calls them in order
/// (`load_metadata`, `seek`, `sample`), each on a blocking worker and each
/// bounded by its own timeout.
pub trait DecodeContext: Send {
    /// Read container metadata (natural size, duration).
    fn load_metadata(&mut self) -> Result<StreamMetadata, FramegrabError>;

    /// Decode up to the frame on screen at `target`.
    ///
    /// If the stream ends first, or the target is
    /// [`SeekTarget::EndOfStream`], the last decodable frame is located.
    fn seek(&mut self, target: SeekTarget) -> Result<(), FramegrabError>;

    /// Copy the frame located by the last [`seek`](DecodeContext::seek)
    /// into `surface` at natural size. Frames are never rescaled; a frame
    /// whose size differs from the surface is a decode error.
    fn sample(&mut self, surface: &mut RgbaImage) -> Result<(), FramegrabError>;
}

/// FFmpeg-backed decoding via `ffmpeg-next`.
///
/// The source bytes are spooled to a scratch file owned by the context and
/// removed when the context drops.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }
}

impl DecodeBackend for FfmpegBackend {
    fn open(&self, source: &VideoSource) -> Result<Box<dyn DecodeContext>, FramegrabError> {
        ffmpeg_next::init().map_err(|error| {
            FramegrabError::DecodeError(format!("FFmpeg initialisation failed: {error}"))
        })?;

        let mut scratch = tempfile::Builder::new()
            .prefix("framegrab-")
            .suffix(&source.extension().map(|ext| format!(".{ext}")).unwrap_or_default())
            .tempfile()?;
        scratch.write_all(source.bytes())?;
        scratch.flush()?;

        let input = ffmpeg_next::format::input(&scratch.path()).map_err(|error| {
            FramegrabError::DecodeError(format!("cannot open source: {error}"))
        })?;

        log::debug!(
            "Opened {} source ({} bytes) as {}",
            source.media_type(),
            source.len(),
            input.format().name()
        );

        Ok(Box::new(FfmpegContext {
            input,
            stream: None,
            located: None,
            _scratch: scratch,
        }))
    }
}

/// The video stream selected once metadata is loaded.
struct SelectedStream {
    index: usize,
    time_base: Rational,
    start_offset: Duration,
    decoder: VideoDecoder,
}

struct FfmpegContext {
    input: Input,
    stream: Option<SelectedStream>,
    located: Option<VideoFrame>,
    // Declared last so the file outlives the demuxer reading it.
    _scratch: NamedTempFile,
}

impl DecodeContext for FfmpegContext {
    fn load_metadata(&mut self) -> Result<StreamMetadata, FramegrabError> {
        let stream = self.input.streams().best(Type::Video).ok_or_else(|| {
            FramegrabError::DecodeError("no video stream found in source".to_string())
        })?;

        let index = stream.index();
        let time_base = stream.time_base();
        let start_offset =
            stream_duration(stream.start_time(), time_base).unwrap_or(Duration::ZERO);
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let mut frames_per_second = rational_to_fps(stream.avg_frame_rate());
        if frames_per_second == 0.0 {
            frames_per_second = rational_to_fps(stream.rate());
        }

        let duration = container_duration(self.input.duration())
            .or_else(|| stream_duration(stream.duration(), time_base));

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = StreamMetadata {
            width: decoder.width(),
            height: decoder.height(),
            duration,
            frames_per_second,
            codec,
            format: self.input.format().name().to_string(),
        };

        log::debug!(
            "Video stream {index}: {}x{}, {:.2} fps, codec={}, duration={:?}",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.codec,
            metadata.duration,
        );

        self.stream = Some(SelectedStream {
            index,
            time_base,
            start_offset,
            decoder,
        });
        Ok(metadata)
    }

    fn seek(&mut self, target: SeekTarget) -> Result<(), FramegrabError> {
        let selected = self.stream.as_mut().ok_or_else(|| {
            FramegrabError::DecodeError("seek requested before metadata was loaded".to_string())
        })?;

        // Timestamps are absolute, so shift the target by the stream's start.
        // Without a target time, decode from the start until the stream ends.
        let (landing, target_seconds) = match target {
            SeekTarget::At(offset) => {
                let absolute = selected.start_offset + offset;
                (absolute, absolute.as_secs_f64())
            }
            SeekTarget::EndOfStream => (selected.start_offset, f64::INFINITY),
        };

        // Land on the keyframe at or before the target, then decode forward.
        let timestamp = duration_to_seek_timestamp(landing);
        self.input.seek(timestamp, ..timestamp)?;
        selected.decoder.flush();

        let mut decoded = VideoFrame::empty();
        let mut visible: Option<VideoFrame> = None;

        for (stream, packet) in self.input.packets() {
            if stream.index() != selected.index {
                continue;
            }
            // Corrupt packets are skipped; a stream with nothing decodable
            // surfaces below as "no frame decoded".
            if let Err(error) = selected.decoder.send_packet(&packet) {
                log::warn!("Skipping undecodable packet: {error}");
                continue;
            }
            while selected.decoder.receive_frame(&mut decoded).is_ok() {
                if keep_visible(&mut visible, &mut decoded, selected.time_base, target_seconds) {
                    self.located = visible;
                    return Ok(());
                }
            }
        }

        // End of stream before passing the target: drain the decoder.
        selected.decoder.send_eof()?;
        while selected.decoder.receive_frame(&mut decoded).is_ok() {
            if keep_visible(&mut visible, &mut decoded, selected.time_base, target_seconds) {
                break;
            }
        }

        match visible {
            Some(frame) => {
                self.located = Some(frame);
                Ok(())
            }
            None => Err(FramegrabError::DecodeError(format!(
                "no frame could be decoded near {target}"
            ))),
        }
    }

    fn sample(&mut self, surface: &mut RgbaImage) -> Result<(), FramegrabError> {
        let frame = self.located.as_ref().ok_or_else(|| {
            FramegrabError::DecodeError("no decoded frame to sample".to_string())
        })?;
        draw_frame(frame, surface)
    }
}

/// Convert `frame` to RGBA into `surface`, pixel format only.
fn draw_frame(frame: &VideoFrame, surface: &mut RgbaImage) -> Result<(), FramegrabError> {
    let (width, height) = surface.dimensions();
    if (frame.width(), frame.height()) != (width, height) {
        return Err(FramegrabError::DecodeError(format!(
            "decoded frame is {}x{}, surface is {width}x{height}",
            frame.width(),
            frame.height()
        )));
    }

    let mut converter = ScalingContext::get(
        frame.format(),
        width,
        height,
        Pixel::RGBA,
        width,
        height,
        ScalingFlags::POINT,
    )?;

    let mut rgba_frame = VideoFrame::empty();
    converter.run(frame, &mut rgba_frame)?;

    let buffer = frame_to_buffer(&rgba_frame, width, height, BYTES_PER_PIXEL);
    let pixels: &mut [u8] = &mut *surface;
    if buffer.len() != pixels.len() {
        return Err(FramegrabError::DecodeError(format!(
            "converted frame holds {} bytes, surface needs {}",
            buffer.len(),
            pixels.len()
        )));
    }
    pixels.copy_from_slice(&buffer);
    Ok(())
}

/// Track the frame on screen at `target_seconds`: the latest frame whose
/// presentation time is not after the target, or the first frame at all if
/// the stream starts after it. Returns `true` once a later frame shows the
/// search is over.
fn keep_visible(
    visible: &mut Option<VideoFrame>,
    decoded: &mut VideoFrame,
    time_base: Rational,
    target_seconds: f64,
) -> bool {
    let past_target = frame_seconds(decoded, time_base) > target_seconds;
    if !past_target || visible.is_none() {
        *visible = Some(std::mem::replace(decoded, VideoFrame::empty()));
    }
    past_target
}

/// Presentation time of a decoded frame in seconds.
fn frame_seconds(frame: &VideoFrame, time_base: Rational) -> f64 {
    frame
        .timestamp()
        .or_else(|| frame.pts())
        .map(|pts| pts_to_seconds(pts, time_base))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_frame(width: u32, height: u32, fill: u8) -> VideoFrame {
        let mut frame = VideoFrame::new(Pixel::RGBA, width, height);
        frame.data_mut(0).fill(fill);
        frame
    }

    #[test]
    fn frames_of_another_size_are_not_rescaled() {
        let frame = rgba_frame(32, 16, 200);
        let mut surface = RgbaImage::new(64, 32);

        let result = draw_frame(&frame, &mut surface);
        assert!(
            matches!(result, Err(FramegrabError::DecodeError(ref message)) if message.contains("32x16")),
            "Expected DecodeError, got: {result:?}"
        );
        assert!(surface.pixels().all(|pixel| pixel.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn natural_size_frames_are_copied() {
        let frame = rgba_frame(32, 16, 200);
        let mut surface = RgbaImage::new(32, 16);

        draw_frame(&frame, &mut surface).expect("same-size conversion");
        assert!(surface.pixels().all(|pixel| pixel.0 == [200, 200, 200, 200]));
    }

    #[test]
    fn end_of_stream_keeps_the_latest_frame() {
        let time_base = Rational::new(1, 30);
        let mut visible = None;

        for pts in 0..5 {
            let mut decoded = rgba_frame(2, 2, pts as u8);
            decoded.set_pts(Some(pts));
            assert!(!keep_visible(&mut visible, &mut decoded, time_base, f64::INFINITY));
        }

        let kept = visible.expect("a frame is kept");
        assert_eq!(kept.pts(), Some(4));
    }

    #[test]
    fn timed_target_keeps_the_frame_on_screen() {
        let time_base = Rational::new(1, 10);
        let mut visible = None;

        for pts in 0..5 {
            let mut decoded = rgba_frame(2, 2, 0);
            decoded.set_pts(Some(pts));
            if keep_visible(&mut visible, &mut decoded, time_base, 0.25) {
                break;
            }
        }

        assert_eq!(visible.and_then(|frame| frame.pts()), Some(2));
    }
}

//! Scripted decode backend shared by the integration tests.
//!
//! Lets the pipeline be driven without FFmpeg: each script decides what the
//! open, metadata, seek and sample steps do.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use framegrab::{
    DecodeBackend, DecodeContext, FramegrabError, SeekTarget, StreamMetadata, VideoSource,
};
use image::RgbaImage;

/// What a scripted context does at each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Every step succeeds immediately.
    Healthy,
    /// `open` fails, as for a corrupt container.
    CorruptSource,
    /// `open` succeeds but `load_metadata` finds no video stream.
    MetadataError,
    /// `load_metadata` blocks for the given time before succeeding.
    SlowMetadata(Duration),
    /// `seek` blocks for the given time before succeeding.
    StuckSeek(Duration),
    /// `seek` finds nothing to decode.
    EmptyStream,
}

pub struct ScriptedBackend {
    metadata: StreamMetadata,
    script: Script,
    seeks: Arc<Mutex<Vec<SeekTarget>>>,
}

impl ScriptedBackend {
    pub fn new(width: u32, height: u32, duration: Duration, script: Script) -> Self {
        Self::with_metadata(metadata(width, height, Some(duration)), script)
    }

    /// A stream whose container reports no duration.
    pub fn without_duration(width: u32, height: u32, script: Script) -> Self {
        Self::with_metadata(metadata(width, height, None), script)
    }

    fn with_metadata(metadata: StreamMetadata, script: Script) -> Self {
        Self {
            metadata,
            script,
            seeks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Seek targets requested so far, across all contexts.
    pub fn seeks(&self) -> Vec<SeekTarget> {
        self.seeks.lock().unwrap().clone()
    }
}

impl DecodeBackend for ScriptedBackend {
    fn open(&self, _source: &VideoSource) -> Result<Box<dyn DecodeContext>, FramegrabError> {
        if self.script == Script::CorruptSource {
            return Err(FramegrabError::DecodeError(
                "Invalid data found when processing input".to_string(),
            ));
        }
        Ok(Box::new(ScriptedContext {
            metadata: self.metadata.clone(),
            script: self.script,
            seeks: Arc::clone(&self.seeks),
            target: None,
        }))
    }
}

struct ScriptedContext {
    metadata: StreamMetadata,
    script: Script,
    seeks: Arc<Mutex<Vec<SeekTarget>>>,
    target: Option<SeekTarget>,
}

impl DecodeContext for ScriptedContext {
    fn load_metadata(&mut self) -> Result<StreamMetadata, FramegrabError> {
        match self.script {
            Script::MetadataError => Err(FramegrabError::DecodeError(
                "no video stream found in source".to_string(),
            )),
            Script::SlowMetadata(delay) => {
                std::thread::sleep(delay);
                Ok(self.metadata.clone())
            }
            _ => Ok(self.metadata.clone()),
        }
    }

    fn seek(&mut self, target: SeekTarget) -> Result<(), FramegrabError> {
        self.seeks.lock().unwrap().push(target);
        match self.script {
            Script::StuckSeek(delay) => std::thread::sleep(delay),
            Script::EmptyStream => {
                return Err(FramegrabError::DecodeError(format!(
                    "no frame could be decoded near {target}"
                )));
            }
            _ => {}
        }
        self.target = Some(target);
        Ok(())
    }

    fn sample(&mut self, surface: &mut RgbaImage) -> Result<(), FramegrabError> {
        let target = self
            .target
            .ok_or_else(|| FramegrabError::DecodeError("nothing located".to_string()))?;
        let shade = frame_shade(target);
        for (x, y, pixel) in surface.enumerate_pixels_mut() {
            *pixel = image::Rgba([(x % 256) as u8, (y % 256) as u8, shade, 255]);
        }
        Ok(())
    }
}

/// Blue channel the scripted decoder paints for a frame at `target`.
///
/// The stream's real last frame is painted 255.
pub fn frame_shade(target: SeekTarget) -> u8 {
    match target {
        SeekTarget::At(offset) => (offset.as_millis() / 100 % 255) as u8,
        SeekTarget::EndOfStream => 255,
    }
}

pub fn metadata(width: u32, height: u32, duration: Option<Duration>) -> StreamMetadata {
    StreamMetadata {
        width,
        height,
        duration,
        frames_per_second: 30.0,
        codec: "h264".to_string(),
        format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
    }
}

pub fn mp4_source() -> VideoSource {
    VideoSource::new(vec![0u8; 64], "video/mp4").unwrap()
}

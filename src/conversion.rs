//! Internal conversion helpers.
//!
//! Pixel-data copying and timestamp conversion shared by the FFmpeg decode
//! context.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};
use ffmpeg_sys_next::{AV_NOPTS_VALUE, AV_TIME_BASE};

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// `bytes_per_pixel` is the number of bytes per pixel of the packed format
/// (4 for RGBA). Row padding is stripped.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Rescale a PTS value from a stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Convert a [`Duration`] to a container-level seek timestamp in
/// `AV_TIME_BASE` units.
pub(crate) fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    let ticks = duration.as_micros() * AV_TIME_BASE as u128 / 1_000_000;
    i64::try_from(ticks).unwrap_or(i64::MAX)
}

/// Convert a container duration in `AV_TIME_BASE` units to a [`Duration`].
///
/// Unknown (`AV_NOPTS_VALUE`) and negative values map to `None`.
pub(crate) fn container_duration(raw: i64) -> Option<Duration> {
    if raw == AV_NOPTS_VALUE || raw <= 0 {
        return None;
    }
    Some(Duration::from_secs_f64(raw as f64 / AV_TIME_BASE as f64))
}

/// Convert a stream duration in its own time base to a [`Duration`].
pub(crate) fn stream_duration(raw: i64, time_base: Rational) -> Option<Duration> {
    if raw == AV_NOPTS_VALUE || raw <= 0 {
        return None;
    }
    let seconds = pts_to_seconds(raw, time_base);
    (seconds > 0.0).then(|| Duration::from_secs_f64(seconds))
}

/// Frames per second from a rational rate, `0.0` when unknown.
pub(crate) fn rational_to_fps(rate: Rational) -> f64 {
    if rate.denominator() == 0 {
        0.0
    } else {
        rate.numerator() as f64 / rate.denominator() as f64
    }
}

//! Frame position selection.
//!
//! [`FramePosition`] picks which end of the timeline to grab. It also owns
//! the seek-target rule: the first frame is requested at zero, the last
//! frame slightly before the reported duration so the decoder never has to
//! seek to (or past) end-of-stream. A stream that reports no duration has
//! its last frame located by decoding through to the end instead.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

/// Which frame of the video to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FramePosition {
    /// The first displayable frame.
    #[default]
    First,
    /// The last displayable frame.
    Last,
}

impl FramePosition {
    /// Lower-case name used in file names and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            FramePosition::First => "first",
            FramePosition::Last => "last",
        }
    }

    /// Where to seek for this position.
    ///
    /// `First` always seeks to zero. `Last` seeks to `duration - epsilon`,
    /// saturating at zero for streams shorter than `epsilon`, or to
    /// [`SeekTarget::EndOfStream`] when the duration is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use framegrab::{FramePosition, SeekTarget};
    ///
    /// let epsilon = Duration::from_millis(100);
    /// let target = FramePosition::Last.seek_target(Some(Duration::from_secs(5)), epsilon);
    /// assert_eq!(target, SeekTarget::At(Duration::from_millis(4900)));
    /// assert_eq!(FramePosition::Last.seek_target(None, epsilon), SeekTarget::EndOfStream);
    /// ```
    pub fn seek_target(self, duration: Option<Duration>, epsilon: Duration) -> SeekTarget {
        match (self, duration) {
            (FramePosition::First, _) => SeekTarget::At(Duration::ZERO),
            (FramePosition::Last, Some(duration)) => {
                SeekTarget::At(duration.saturating_sub(epsilon))
            }
            (FramePosition::Last, None) => SeekTarget::EndOfStream,
        }
    }

    /// Download file name for a frame taken at this position
    /// (`first-frame.png` / `last-frame.png`).
    pub fn file_name(self) -> String {
        format!("{}-frame.png", self.as_str())
    }
}

/// Where the decoder is asked to land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekTarget {
    /// The frame on screen at this offset from the stream start.
    At(Duration),
    /// The last decodable frame; used when the duration is unknown.
    EndOfStream,
}

impl SeekTarget {
    /// The target offset, or `None` for [`SeekTarget::EndOfStream`].
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            SeekTarget::At(offset) => Some(offset),
            SeekTarget::EndOfStream => None,
        }
    }
}

impl Display for SeekTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SeekTarget::At(offset) => write!(f, "{offset:?}"),
            SeekTarget::EndOfStream => f.write_str("end of stream"),
        }
    }
}

impl Display for FramePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for FramePosition {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first" | "start" => Ok(FramePosition::First),
            "last" | "end" => Ok(FramePosition::Last),
            other => Err(format!("unknown frame position: {other} (expected first|last)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: Duration = Duration::from_millis(100);

    #[test]
    fn first_seeks_to_zero() {
        for duration in [Some(Duration::from_secs(5)), None] {
            let target = FramePosition::First.seek_target(duration, EPSILON);
            assert_eq!(target, SeekTarget::At(Duration::ZERO));
        }
    }

    #[test]
    fn last_stays_strictly_before_duration() {
        for millis in [1_u64, 99, 100, 101, 4_000, 5_000, 3_600_000] {
            let duration = Duration::from_millis(millis);
            let target = FramePosition::Last
                .seek_target(Some(duration), EPSILON)
                .as_duration()
                .expect("known duration");
            assert!(target < duration, "target {target:?} >= duration {duration:?}");
        }
    }

    #[test]
    fn last_saturates_for_short_streams() {
        let target = FramePosition::Last.seek_target(Some(Duration::from_millis(40)), EPSILON);
        assert_eq!(target, SeekTarget::At(Duration::ZERO));
    }

    #[test]
    fn last_without_duration_runs_to_end_of_stream() {
        let last = FramePosition::Last.seek_target(None, EPSILON);
        assert_eq!(last, SeekTarget::EndOfStream);
        assert_ne!(last, FramePosition::First.seek_target(None, EPSILON));
        assert_eq!(last.as_duration(), None);
        assert_eq!(last.to_string(), "end of stream");
        assert_eq!(SeekTarget::At(Duration::from_millis(4900)).to_string(), "4.9s");
    }

    #[test]
    fn file_names_follow_position() {
        assert_eq!(FramePosition::First.file_name(), "first-frame.png");
        assert_eq!(FramePosition::Last.file_name(), "last-frame.png");
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("FIRST".parse::<FramePosition>(), Ok(FramePosition::First));
        assert_eq!(" end ".parse::<FramePosition>(), Ok(FramePosition::Last));
        assert!("middle".parse::<FramePosition>().is_err());
    }
}

//! Frame statistics and fault records.

use std::fmt;
use std::time::Duration;

use liveloop_core::DrawError;

use crate::display::EventKind;
use crate::error::DisplayError;

/// Rolling frame-time statistics for one renderer.
///
/// Frame time is the loop's own work (events, clear, drawables, present),
/// not including the pacing sleep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames completed since the renderer was created.
    pub frames: u64,
    /// Rolling average frame time (microseconds).
    pub avg_frame_us: u64,
    /// Worst frame time seen (microseconds).
    pub worst_frame_us: u64,
    /// Frames that missed their pacing deadline.
    pub late_frames: u64,
}

impl FrameStats {
    /// Folds one frame into the statistics: its work time and whether the
    /// pacer still met the frame's deadline.
    pub fn record(&mut self, work: Duration, on_time: bool) {
        let us = u64::try_from(work.as_micros()).unwrap_or(u64::MAX);
        self.avg_frame_us = if self.frames == 0 {
            us
        } else {
            (self.avg_frame_us.saturating_mul(15).saturating_add(us)) / 16
        };
        self.worst_frame_us = self.worst_frame_us.max(us);
        if !on_time {
            self.late_frames += 1;
        }
        self.frames += 1;
    }

    /// Frames per second the loop could sustain at the average frame time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn headroom_fps(&self) -> f64 {
        if self.avg_frame_us == 0 {
            f64::INFINITY
        } else {
            1_000_000.0 / self.avg_frame_us as f64
        }
    }
}

/// What went wrong in a faulted frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultCause {
    /// A drawable's `update()` or `render()` failed or panicked.
    Drawable {
        /// Position in the instance list.
        index: usize,
        /// The drawable's `name()`.
        name: String,
        /// The error it raised.
        error: DrawError,
    },
    /// An event handler panicked.
    Handler {
        /// Kind of event being handled.
        kind: EventKind,
        /// Panic message.
        message: String,
    },
    /// Presenting the frame failed.
    Present(DisplayError),
}

/// A failure that ended the render loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFault {
    /// Frame number (0-based) in which the fault occurred.
    pub frame: u64,
    /// What failed.
    pub cause: FaultCause,
}

impl fmt::Display for FrameFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            FaultCause::Drawable { index, name, error } => {
                write!(f, "frame {}: {name} #{index}: {error}", self.frame)
            }
            FaultCause::Handler { kind, message } => {
                write!(f, "frame {}: {kind:?} handler panicked: {message}", self.frame)
            }
            FaultCause::Present(error) => write!(f, "frame {}: {error}", self.frame),
        }
    }
}

//! Soft real-time pacing of a frame stream.
//!
//! The pacer does not sleep or read a clock. The caller polls it with the time
//! elapsed since playback started and gets told whether to wait, send a frame,
//! or report a frame that missed its deadline. Stopping playback is simply a
//! matter of no longer polling.

use crate::frame::CommandFrame;
use std::fmt;
use tracing::warn;

/// A frame was handed out later than its scheduled time plus tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatencyFault {
    pub tick: u64,
    /// When the frame was due, seconds since start.
    pub scheduled: f64,
    /// When it was actually polled.
    pub elapsed: f64,
}

impl LatencyFault {
    pub fn lateness(&self) -> f64 {
        self.elapsed - self.scheduled
    }
}

impl fmt::Display for LatencyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {} missed its deadline by {:.4}s",
            self.tick,
            self.lateness()
        )
    }
}

/// Outcome of one [`Pacer::poll`].
#[derive(Clone, Debug, PartialEq)]
pub enum Pace {
    /// Nothing is due yet; the next frame is due in this many seconds.
    Wait(f64),
    Ready(CommandFrame),
    /// The frame is still delivered, along with the missed deadline.
    Late {
        frame: CommandFrame,
        fault: LatencyFault,
    },
    Finished,
}

/// Hands out frames from `frames` as their timestamps come due.
pub struct Pacer<I: Iterator<Item = CommandFrame>> {
    frames: std::iter::Peekable<I>,
    tolerance: f64,
    faults: usize,
}

impl<I: Iterator<Item = CommandFrame>> Pacer<I> {
    pub fn new(frames: impl IntoIterator<IntoIter = I>, latency_tolerance: f64) -> Self {
        Self {
            frames: frames.into_iter().peekable(),
            tolerance: latency_tolerance.max(0.0),
            faults: 0,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of late frames handed out so far.
    pub fn fault_count(&self) -> usize {
        self.faults
    }

    /// Returns the next frame if it is due at `elapsed` seconds.
    pub fn poll(&mut self, elapsed: f64) -> Pace {
        let Some(next) = self.frames.peek() else {
            return Pace::Finished;
        };
        if elapsed < next.time {
            return Pace::Wait(next.time - elapsed);
        }
        let Some(frame) = self.frames.next() else {
            return Pace::Finished;
        };
        if elapsed > frame.time + self.tolerance {
            let fault = LatencyFault {
                tick: frame.tick,
                scheduled: frame.time,
                elapsed,
            };
            warn!(%fault, "latency fault");
            self.faults += 1;
            return Pace::Late { frame, fault };
        }
        Pace::Ready(frame)
    }
}

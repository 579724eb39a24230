//! Wall clock driven playback over a [`Timeline`]

use thiserror::Error;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::timeline::{TimedEvent, Timeline};

/// Where the clock is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlaybackStatus {
    /// Nothing loaded
    Idle,
    /// Loaded and waiting to play
    Stopped,
    /// Advancing with the wall clock
    Playing,
    /// Frozen part way through
    Paused,
}

/// Error type for clock control
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The transition is not allowed from the current state
    #[error("Cannot {action} while {status:?}")]
    InvalidTransition {
        /// What was asked for
        action: &'static str,
        /// The state the clock was in
        status: PlaybackStatus,
    },
}

/// A snapshot of the clock for display
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlaybackState {
    /// Index of the next event to fire
    pub cursor: usize,
    /// Seconds into the song
    pub current_time: f64,
    /// Lifecycle state
    pub status: PlaybackStatus,
    /// Length of the loaded song
    pub duration: f64,
}

impl PlaybackState {
    /// How far through the song playback is, from 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Maps a host supplied monotonic time in seconds onto a position in a [`Timeline`] and reports
/// which events become due on each [`PlaybackClock::tick`]
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// The loaded song, empty while idle
    timeline: Timeline,
    /// Index of the next event to fire
    cursor: usize,
    /// Seconds into the song as of the last tick, pause or seek
    current_time: f64,
    /// Host time at which the song would have started, `now - start_reference` is song time
    start_reference: f64,
    /// Lifecycle state
    status: PlaybackStatus,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    /// An idle clock with nothing loaded
    pub fn new() -> Self {
        Self {
            timeline: Timeline::default(),
            cursor: 0,
            current_time: 0.0,
            start_reference: 0.0,
            status: PlaybackStatus::Idle,
        }
    }

    /// A stopped clock with `timeline` loaded
    pub fn with_timeline(timeline: Timeline) -> Self {
        let mut clock = Self::new();
        clock.load(timeline);
        clock
    }

    /// Replaces whatever was loaded and stops at the start
    pub fn load(&mut self, timeline: Timeline) {
        debug!(
            events = timeline.len(),
            duration = timeline.duration(),
            "loaded timeline"
        );
        self.timeline = timeline;
        self.status = PlaybackStatus::Stopped;
        self.rewind();
    }

    /// The loaded song
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Lifecycle state
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Seconds into the song
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Index of the next event to fire
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Snapshot for display
    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            cursor: self.cursor,
            current_time: self.current_time,
            status: self.status,
            duration: self.timeline.duration(),
        }
    }

    /// Starts or resumes playback at host time `now`
    pub fn play(&mut self, now: f64) -> Result<(), ClockError> {
        match self.status {
            PlaybackStatus::Stopped | PlaybackStatus::Paused => {
                self.start_reference = now - self.current_time;
                self.status = PlaybackStatus::Playing;
                debug!(at = self.current_time, "playing");
                Ok(())
            }
            status => Err(ClockError::InvalidTransition {
                action: "play",
                status,
            }),
        }
    }

    /// Freezes playback at the time of the last tick
    pub fn pause(&mut self) -> Result<(), ClockError> {
        match self.status {
            PlaybackStatus::Playing => {
                self.status = PlaybackStatus::Paused;
                debug!(at = self.current_time, "paused");
                Ok(())
            }
            status => Err(ClockError::InvalidTransition {
                action: "pause",
                status,
            }),
        }
    }

    /// Rewinds to the start. An idle clock stays idle.
    pub fn stop(&mut self) {
        if self.status != PlaybackStatus::Idle {
            self.status = PlaybackStatus::Stopped;
        }
        self.rewind();
    }

    /// Moves to `time_seconds`, clamped to the song. The next event to fire becomes the first one
    /// at or after the target; nothing fires until the next tick.
    pub fn seek(&mut self, time_seconds: f64, now: f64) {
        if self.status == PlaybackStatus::Idle {
            return;
        }

        let target = if time_seconds.is_nan() {
            0.0
        } else {
            time_seconds.clamp(0.0, self.timeline.duration())
        };

        self.cursor = self.timeline.first_at_or_after(target);
        self.current_time = target;

        if self.status == PlaybackStatus::Playing {
            self.start_reference = now - target;
        }

        debug!(target, cursor = self.cursor, "seeked");
    }

    /// Advances to host time `now` and returns every event that fell due since the last tick, in
    /// time order. Reaching the end of the song stops the clock.
    pub fn tick(&mut self, now: f64) -> &[TimedEvent] {
        if self.status != PlaybackStatus::Playing {
            return &[];
        }

        let elapsed = (now - self.start_reference).max(0.0);
        let start = self.cursor;
        let events = self.timeline.events();
        let end = start
            + events[start..].partition_point(|event| event.time_seconds() <= elapsed);

        self.cursor = end;
        self.current_time = elapsed;

        if end >= events.len() {
            debug!("reached the end of the song");
            self.stop();
        }

        &self.timeline.events()[start..end]
    }

    /// Cursor and time back to zero
    fn rewind(&mut self) {
        self.cursor = 0;
        self.current_time = 0.0;
    }
}

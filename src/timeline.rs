//! Merging of all tracks into one sequence of events stamped with absolute time in seconds

use thiserror::Error;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    chunk::{header::Division, track::Event},
    ParsedMidi,
};

pub mod lyrics;

/// Tempo assumed until a file sets one, 120 beats per minute
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Microseconds in a second
const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Microseconds in a minute, for beats per minute conversions
const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// Converts a tick count to seconds. With metrical timing `tempo` is the microseconds per quarter
/// note in effect, with SMPTE timing it is ignored.
pub fn ticks_to_seconds(ticks: u64, division: Division, tempo: u32) -> f64 {
    match division {
        Division::Metrical(ticks_per_quarter) => {
            ticks as f64 / ticks_per_quarter as f64 * (tempo as f64 / MICROS_PER_SECOND)
        }
        Division::TimeCodeBased(smpte) => {
            ticks as f64 / (smpte.fps().as_f64() * smpte.ticks_per_frame() as f64)
        }
    }
}

/// Inverse of [`ticks_to_seconds`] at a constant tempo
pub fn seconds_to_ticks(seconds: f64, division: Division, tempo: u32) -> f64 {
    match division {
        Division::Metrical(ticks_per_quarter) => {
            seconds / (tempo as f64 / MICROS_PER_SECOND) * ticks_per_quarter as f64
        }
        Division::TimeCodeBased(smpte) => {
            seconds * smpte.fps().as_f64() * smpte.ticks_per_frame() as f64
        }
    }
}

/// Error type for scheduling options that would break the timeline's time order
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ScheduleError {
    /// Time warp that is zero, negative or not finite
    #[error("Time warp must be a positive finite number, got {0}")]
    TimeWarp(f64),
    /// Beats per minute that do not map to a usable tempo
    #[error("Tempo of {0} beats per minute is out of range")]
    Bpm(f64),
    /// A tempo override of 0 microseconds per quarter note
    #[error("Tempo override must be at least 1 microsecond per quarter note")]
    ZeroTempo,
}

/// Knobs for building a timeline
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScheduleOptions {
    /// Fixed microseconds per quarter note. When set, tempo events in the file are ignored
    pub tempo_override: Option<u32>,
    /// Multiplier applied to every duration, 2.0 plays at half speed
    pub time_warp: f64,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            tempo_override: None,
            time_warp: 1.0,
        }
    }
}

impl ScheduleOptions {
    /// Locks playback to a tempo given in beats per minute
    pub fn from_bpm(bpm: f64) -> Result<Self, ScheduleError> {
        let micros = (MICROS_PER_MINUTE / bpm).round();

        if !(bpm.is_finite() && bpm > 0.0) || !(1.0..=u32::MAX as f64).contains(&micros) {
            return Err(ScheduleError::Bpm(bpm));
        }

        Ok(Self {
            tempo_override: Some(micros as u32),
            ..Self::default()
        })
    }

    /// Replaces the time warp
    pub fn with_time_warp(mut self, time_warp: f64) -> Result<Self, ScheduleError> {
        self.time_warp = time_warp;
        self.validate()?;
        Ok(self)
    }

    /// Checks that every event time will come out finite and in order
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !(self.time_warp.is_finite() && self.time_warp > 0.0) {
            return Err(ScheduleError::TimeWarp(self.time_warp));
        }
        if self.tempo_override == Some(0) {
            return Err(ScheduleError::ZeroTempo);
        }
        Ok(())
    }
}

/// An event placed on the song's timeline
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimedEvent {
    /// Seconds since the start of the song
    time_seconds: f64,
    /// Index of the track the event came from
    track: usize,
    /// The event itself
    event: Event,
}

impl TimedEvent {
    /// Places an event on the timeline
    pub fn new(time_seconds: f64, track: usize, event: Event) -> Self {
        Self {
            time_seconds,
            track,
            event,
        }
    }

    /// Seconds since the start of the song
    pub fn time_seconds(&self) -> f64 {
        self.time_seconds
    }

    /// Index of the track the event came from
    pub fn track(&self) -> usize {
        self.track
    }

    /// The event itself
    pub fn event(&self) -> &Event {
        &self.event
    }
}

/// Every event of a song in time order, plus its length
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timeline {
    /// Events sorted by time, ties in merge order
    events: Vec<TimedEvent>,
    /// Time of the last event
    duration: f64,
}

impl Timeline {
    /// Wraps events that are already in time order. The duration is the last event's time.
    pub fn new(events: Vec<TimedEvent>) -> Self {
        let duration = events.last().map_or(0.0, TimedEvent::time_seconds);
        Self { events, duration }
    }

    /// Events in time order
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    /// Seconds from the start to the last event
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if there is nothing to play
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index of the first event at or after `time_seconds`, or the length if there is none
    pub fn first_at_or_after(&self, time_seconds: f64) -> usize {
        self.events
            .partition_point(|event| event.time_seconds < time_seconds)
    }

    /// Relative position (0.0 to 1.0) of every note on that makes a sound
    pub fn note_markers(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter(|event| event.event.audible_note_on().is_some())
            .map(|event| {
                if self.duration > 0.0 {
                    event.time_seconds / self.duration
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// Merge progress for a single track
#[derive(Debug, Clone, Copy)]
struct TrackState {
    /// Index of the next event to emit
    next_index: usize,
    /// Ticks until that event, `None` once the track is exhausted
    ticks_to_next_event: Option<u64>,
}

/// Builds a [`Timeline`] from a parsed file by repeatedly taking the track whose next event is
/// closest, so events from every track interleave in true time order
#[derive(Debug, Clone, Copy)]
pub struct Scheduler<'a> {
    /// The file being scheduled
    midi: &'a ParsedMidi,
    /// Tempo override and time warp
    options: ScheduleOptions,
}

impl<'a> Scheduler<'a> {
    /// Creates a scheduler with default options
    pub fn new(midi: &'a ParsedMidi) -> Self {
        Self {
            midi,
            options: ScheduleOptions::default(),
        }
    }

    /// Replaces the options, rejecting any that would put events out of time order
    pub fn with_options(mut self, options: ScheduleOptions) -> Result<Self, ScheduleError> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    /// Runs the merge
    pub fn schedule(self) -> Timeline {
        let tracks = self.midi.tracks();
        let division = self.midi.header().division();
        let ScheduleOptions {
            tempo_override,
            time_warp,
        } = self.options;

        let mut states: Vec<TrackState> = tracks
            .iter()
            .map(|track| TrackState {
                next_index: 0,
                ticks_to_next_event: track.events().first().map(|e| e.delta_time() as u64),
            })
            .collect();

        let mut tempo = tempo_override.unwrap_or(DEFAULT_TEMPO);
        // Time is measured from the last tempo change so rounding does not build up
        let mut segment_start = 0.0;
        let mut segment_ticks: u64 = 0;

        let mut events = Vec::with_capacity(tracks.iter().map(|track| track.len()).sum());

        while let Some((index, ticks)) = next_track(&states) {
            segment_ticks += ticks;
            let time_seconds =
                segment_start + ticks_to_seconds(segment_ticks, division, tempo) * time_warp;

            let track = tracks[index].events();
            let state = &mut states[index];
            let event = track[state.next_index].event().clone();

            state.next_index += 1;
            state.ticks_to_next_event = track
                .get(state.next_index)
                .map(|next| next.delta_time() as u64);

            for (other, state) in states.iter_mut().enumerate() {
                if other == index {
                    continue;
                }
                if let Some(pending) = state.ticks_to_next_event.as_mut() {
                    *pending -= ticks;
                }
            }

            // A tempo change applies to the ticks after it
            if let (None, Some(new_tempo)) = (tempo_override, event.tempo()) {
                tempo = new_tempo;
                segment_start = time_seconds;
                segment_ticks = 0;
            }

            events.push(TimedEvent::new(time_seconds, index, event));
        }

        let timeline = Timeline::new(events);
        debug!(
            events = timeline.len(),
            duration = timeline.duration(),
            "scheduled timeline"
        );
        timeline
    }
}

/// Picks the track whose next event is the fewest ticks away, lowest index on ties
fn next_track(states: &[TrackState]) -> Option<(usize, u64)> {
    let mut best: Option<(usize, u64)> = None;

    for (index, state) in states.iter().enumerate() {
        if let Some(ticks) = state.ticks_to_next_event {
            if best.map_or(true, |(_, best_ticks)| ticks < best_ticks) {
                best = Some((index, ticks));
            }
        }
    }

    best
}

/// Schedules a file with an optional fixed tempo in microseconds per quarter note. An override of
/// 0 is treated as no override.
pub fn schedule(midi: &ParsedMidi, tempo_override: Option<u32>) -> Timeline {
    Scheduler {
        midi,
        options: ScheduleOptions {
            tempo_override: tempo_override.filter(|&tempo| tempo > 0),
            ..ScheduleOptions::default()
        },
    }
    .schedule()
}

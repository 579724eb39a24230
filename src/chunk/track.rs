//! Track chunk data enums and structs

use status::NoteMeta;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::reader::{ByteReader, ReadError};

pub use meta::MetaEvent;

pub mod meta;
pub mod status;
pub mod sysex;
pub mod text;

/// Error types from decoding a track. Positions are offsets into the track chunk's data.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackError {
    /// An event's bytes run past the chunk's declared length
    #[error("Event at position {0} runs past the end of the track chunk")]
    Overrun(usize),
    /// A delta time or length field is longer than 4 bytes
    #[error("Corrupt variable length quantity at position {0}")]
    CorruptVlq(usize),
    /// A data byte showed up before any channel status byte
    #[error("Data byte {byte:#04X} at position {position} with no running status")]
    MissingRunningStatus {
        /// The offending byte
        byte: u8,
        /// Where it was found
        position: usize,
    },
    /// A status byte whose payload length cannot be known
    #[error("Unsupported status byte {status:#04X} at position {position}")]
    UnsupportedEvent {
        /// The status byte
        status: u8,
        /// Where it was found
        position: usize,
    },
    /// A set tempo meta event without exactly 3 payload bytes
    #[error("Tempo meta event at position {position} has {len} payload byte(s), expected 3")]
    InvalidTempo {
        /// Start of the payload
        position: usize,
        /// Declared payload length
        len: usize,
    },
}

impl From<ReadError> for TrackError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::OutOfBounds { position, .. } => Self::Overrun(position),
            ReadError::CorruptVlq(position) => Self::CorruptVlq(position),
        }
    }
}

/// A track chunk, containing one or more MTrk events in delta time order
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackChunk {
    /// All associated track events to this chunk
    pub(crate) mtrk_events: Vec<MTrkEvent>,
}

impl TrackChunk {
    /// Builds a track from already decoded events
    pub fn new(mtrk_events: Vec<MTrkEvent>) -> Self {
        Self { mtrk_events }
    }

    /// Decodes every event in a track chunk's data
    pub fn decode(data: &[u8]) -> Result<Self, TrackError> {
        let mut reader = ByteReader::new(data);
        let mut running_status = None;
        let mut mtrk_events = vec![];

        while !reader.is_at_end() {
            mtrk_events.push(MTrkEvent::read(&mut reader, &mut running_status)?);
        }

        Ok(Self { mtrk_events })
    }

    /// The track's events
    pub fn events(&self) -> &[MTrkEvent] {
        &self.mtrk_events
    }

    /// Number of events in the track
    pub fn len(&self) -> usize {
        self.mtrk_events.len()
    }

    /// Returns true if the track holds no events
    pub fn is_empty(&self) -> bool {
        self.mtrk_events.is_empty()
    }
}

impl TryFrom<&[u8]> for TrackChunk {
    type Error = TrackError;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::decode(value)
    }
}

/// A MIDI Event with a DeltaTime and an attached Event
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MTrkEvent {
    /// Delta time is a variable-length representation of how much time to wait in ticks before the
    /// event follows.
    delta_time: u32,
    /// The event that occurs after the delta time is waited for
    event: Event,
}

impl MTrkEvent {
    /// Pairs an event with its delta time
    pub fn new(delta_time: u32, event: Event) -> Self {
        Self { delta_time, event }
    }

    /// Ticks since the previous event in the same track
    pub fn delta_time(&self) -> u32 {
        self.delta_time
    }

    /// The decoded event
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Reads a delta time followed by one event. `running_status` carries the last channel status
    /// between calls.
    fn read(
        reader: &mut ByteReader<'_>,
        running_status: &mut Option<u8>,
    ) -> Result<Self, TrackError> {
        let delta_time = reader.read_vlq()?;
        let event = Event::read(reader, running_status)?;

        Ok(Self { delta_time, event })
    }
}

/// Any event a track may hold
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Event {
    /// Note released, with its channel
    NoteOff(u8, NoteMeta),
    /// Note pressed, with its channel. A velocity of 0 is a release in practice
    NoteOn(u8, NoteMeta),
    /// Specifies non-MIDI information useful to this format or to sequencers
    MetaEvent(MetaEvent),
    /// An event that was skipped, identified by its status byte
    Other(u8),
}

impl Event {
    /// Reads one event's status and payload
    fn read(
        reader: &mut ByteReader<'_>,
        running_status: &mut Option<u8>,
    ) -> Result<Self, TrackError> {
        let position = reader.position();
        let candidate = reader.peek_u8()?;

        // Data byte first means the previous channel status is reused and the byte is not consumed
        let status = if candidate & 0x80 == 0 {
            running_status.ok_or(TrackError::MissingRunningStatus {
                byte: candidate,
                position,
            })?
        } else {
            reader.read_u8()?;
            candidate
        };

        match status {
            0xFF => Ok(Event::MetaEvent(MetaEvent::read(reader)?)),
            0xF0 | 0xF7 => {
                sysex::skip(reader)?;
                Ok(Event::Other(status))
            }
            0xF1..=0xFE => Err(TrackError::UnsupportedEvent { status, position }),
            _ => {
                *running_status = Some(status);
                status::read_channel_event(status, reader)
            }
        }
    }

    /// Key and velocity of a note on that should actually sound
    pub fn audible_note_on(&self) -> Option<NoteMeta> {
        match self {
            Self::NoteOn(_, meta) if meta.velocity() > 0 => Some(*meta),
            _ => None,
        }
    }

    /// Microseconds per quarter note if this is a set tempo event
    pub fn tempo(&self) -> Option<u32> {
        match self {
            Self::MetaEvent(MetaEvent::Tempo(tempo)) => Some(*tempo),
            _ => None,
        }
    }
}

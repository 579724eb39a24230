//! Channel message status handling

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Event, TrackError};
use crate::reader::ByteReader;

/// Note off status nibble
const NOTE_OFF: u8 = 0x8;
/// Note on status nibble
const NOTE_ON: u8 = 0x9;

/// Metadata for a note's relative info, key and velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NoteMeta {
    /// Note key
    key: u8,
    /// Note velocity
    velocity: u8,
}

impl NoteMeta {
    /// Creates note metadata, both values are masked to 7 bits
    pub fn new(key: u8, velocity: u8) -> Self {
        Self {
            key: key & 0x7F,
            velocity: velocity & 0x7F,
        }
    }

    /// MIDI note number, 60 is middle C
    pub fn key(&self) -> u8 {
        self.key
    }

    /// Strike velocity, 0 to 127
    pub fn velocity(&self) -> u8 {
        self.velocity
    }
}

/// Number of data bytes following a channel status byte
pub fn data_len(status: u8) -> usize {
    match status >> 4 {
        0xC | 0xD => 1,
        _ => 2,
    }
}

/// Reads the data bytes of a channel message. Only notes are kept, every other channel message is
/// skipped and reported as [`Event::Other`].
pub(crate) fn read_channel_event(
    status: u8,
    reader: &mut ByteReader<'_>,
) -> Result<Event, TrackError> {
    let channel = status & 0x0F;

    match status >> 4 {
        NOTE_OFF | NOTE_ON => {
            let key = reader.read_u8()?;
            let velocity = reader.read_u8()?;
            let meta = NoteMeta::new(key, velocity);

            Ok(if status >> 4 == NOTE_ON {
                Event::NoteOn(channel, meta)
            } else {
                Event::NoteOff(channel, meta)
            })
        }
        _ => {
            reader.read_bytes(data_len(status))?;
            Ok(Event::Other(status))
        }
    }
}

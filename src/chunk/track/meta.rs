//! Meta Event Structs and Parsing

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{text::decode_text, TrackError};
use crate::reader::ByteReader;

/// Text event subtype
pub const TEXT: u8 = 0x01;
/// Lyric subtype
pub const LYRIC: u8 = 0x05;
/// Marker subtype
pub const MARKER: u8 = 0x06;
/// End of track subtype
pub const END_OF_TRACK: u8 = 0x2F;
/// Set tempo subtype
pub const SET_TEMPO: u8 = 0x51;

/// A meta level event
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MetaEvent {
    /// Any of the text family, tags 0x01 through 0x0F (text, copyright, track name, lyric,
    /// marker, cue point and so on)
    Text {
        /// The meta subtype
        subtype: u8,
        /// Decoded text payload
        text: String,
    },
    /// Tempo in microseconds per quarter note, tag 0x51
    Tempo(u32),
    /// End of Track Identifier, tag 0x2F
    EndOfTrack,
    /// Any other meta event, payload kept but not interpreted
    Unknown {
        /// The meta subtype
        subtype: u8,
        /// Raw payload
        payload: Vec<u8>,
    },
}

impl MetaEvent {
    /// Returns the specific event's tag
    pub fn get_tag(&self) -> u8 {
        match self {
            Self::Text { subtype, .. } => *subtype,
            Self::Tempo(_) => SET_TEMPO,
            Self::EndOfTrack => END_OF_TRACK,
            Self::Unknown { subtype, .. } => *subtype,
        }
    }

    /// Reads the subtype, length and payload that follow a `0xFF` status byte
    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, TrackError> {
        let subtype = reader.read_u8()?;
        let len = reader.read_vlq()? as usize;
        let position = reader.position();
        let payload = reader.read_bytes(len)?;

        Ok(match subtype {
            0x01..=0x0F => Self::Text {
                subtype,
                text: decode_text(payload),
            },
            END_OF_TRACK => Self::EndOfTrack,
            SET_TEMPO => match payload {
                [a, b, c] => Self::Tempo(u32::from_be_bytes([0, *a, *b, *c])),
                _ => return Err(TrackError::InvalidTempo { position, len }),
            },
            _ => Self::Unknown {
                subtype,
                payload: payload.to_vec(),
            },
        })
    }
}

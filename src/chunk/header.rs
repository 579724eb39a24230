//! Header Chunk Enum and Struct Definitions

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Header chunk data, including format, ntrks and division as 3 16 bit unsigned integers
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeaderChunk {
    /// The MIDI format
    format: Format,
    /// Number of tracks
    ntrks: u16,
    /// Time signature/division
    division: Division,
}

impl HeaderChunk {
    /// The file's organization
    pub fn format(&self) -> Format {
        self.format
    }

    /// How many track chunks follow the header
    pub fn track_count(&self) -> u16 {
        self.ntrks
    }

    /// How delta times are measured
    pub fn division(&self) -> Division {
        self.division
    }

    /// Ticks per quarter note, if the file uses metrical timing
    pub fn ticks_per_quarter_note(&self) -> Option<u16> {
        match self.division {
            Division::Metrical(ticks) => Some(ticks),
            Division::TimeCodeBased(_) => None,
        }
    }
}

impl TryFrom<(u16, u16, u16)> for HeaderChunk {
    type Error = InvalidFormat;
    fn try_from(value: (u16, u16, u16)) -> Result<Self, Self::Error> {
        let (format, ntrks, division) = value;

        Ok(Self {
            format: format.try_into()?,
            ntrks,
            division: division.try_into()?,
        })
    }
}

/// The overall organization of the MIDI file. Only three values are valid, making most of the 16
/// bits irrelevant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Format {
    /// The file contains a single multi-channel track
    Zero,
    /// The file contains one or more simultaneous tracks (or MIDI outputs) of a sequence
    One,
    /// The file contains one or more sequentially independent single-track patterns
    Two,
}

/// Reasons a file's structure was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidFormat {
    /// The first chunk is not `MThd`
    #[error("Missing MThd header chunk, found {0:?}")]
    MissingHeader([char; 4]),
    /// The header chunk is too short to hold format, ntrks and division
    #[error("Header chunk length {0} is shorter than 6 bytes")]
    HeaderLength(u32),
    /// Format is not 0, 1 or 2
    #[error("Unknown MIDI format {0}")]
    UnknownFormat(u16),
    /// A metrical division of zero ticks per quarter note
    #[error("Division of zero ticks per quarter note")]
    ZeroDivision,
    /// SMPTE division with a frame rate other than 24, 25, 29.97 or 30
    #[error("Unsupported SMPTE frame rate {0}")]
    SmpteFrameRate(i8),
}

impl TryFrom<u16> for Format {
    type Error = InvalidFormat;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Format::Zero),
            1 => Ok(Format::One),
            2 => Ok(Format::Two),
            other => Err(InvalidFormat::UnknownFormat(other)),
        }
    }
}

/// The meaning of the delta-times in the MIDI sequence,
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Division {
    /// When bit 15 is a 0, bits 14-0 represent ticks per quarter note
    Metrical(u16),
    /// When bit 15 is 1, bits 14-8 represent the negative SMPTE format,
    /// and bits 7-0 represent ticks per frame
    TimeCodeBased(SmpteTicks),
}

/// Frame rates allowed in a time-code-based division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SmpteFps {
    /// 24 frames per second
    TwentyFour,
    /// 25 frames per second
    TwentyFive,
    /// 30 drop frame, 29.97 frames per second
    TwentyNine,
    /// 30 frames per second
    Thirty,
}

impl SmpteFps {
    /// Frames per second as a float, 29.97 for drop frame
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::TwentyFour => 24.0,
            Self::TwentyFive => 25.0,
            Self::TwentyNine => 29.97,
            Self::Thirty => 30.0,
        }
    }
}

/// Division defined by time-code-based time
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmpteTicks {
    /// Frames per second
    fps: SmpteFps,
    /// 8 bits of ticks per frame
    tpf: u8,
}

impl SmpteTicks {
    /// Frames per second
    pub fn fps(&self) -> SmpteFps {
        self.fps
    }

    /// Ticks per frame
    pub fn ticks_per_frame(&self) -> u8 {
        self.tpf
    }
}

impl TryFrom<u16> for Division {
    type Error = InvalidFormat;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value & 0x8000 == 0 {
            return match value {
                0 => Err(InvalidFormat::ZeroDivision),
                ticks => Ok(Division::Metrical(ticks)),
            };
        }

        // High byte is the frame rate as a negative two's complement number
        let smpte = (value >> 8) as u8 as i8;
        let tpf = value as u8;

        let fps = match smpte {
            -24 => SmpteFps::TwentyFour,
            -25 => SmpteFps::TwentyFive,
            -29 => SmpteFps::TwentyNine,
            -30 => SmpteFps::Thirty,
            other => return Err(InvalidFormat::SmpteFrameRate(other)),
        };

        if tpf == 0 {
            return Err(InvalidFormat::ZeroDivision);
        }

        Ok(Division::TimeCodeBased(SmpteTicks { fps, tpf }))
    }
}

//! Chunk level parsing: the file header and the framing of track chunks

use header::{HeaderChunk, InvalidFormat};
use thiserror::Error;
use track::TrackError;
use tracing::warn;

use crate::{
    chunk::chunk_types::{HEADER_CHUNK, TRACK_DATA_CHUNK},
    reader::{ByteReader, ReadError},
    Chunk,
};

pub mod chunk_types;
pub mod header;
pub mod track;

/// Bytes taken by a chunk's type tag and length
pub const CHUNK_PREFIX_LEN: usize = 8;

/// Bytes of header data this crate interprets
const HEADER_DATA_LEN: u32 = 6;

/// Error type for any failure while parsing a file. Parsing stops at the first one.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ChunkParseError {
    /// Invalid format in parsing a header
    #[error("Invalid Format Specified: {0}")]
    InvalidFormat(#[from] InvalidFormat),
    /// A chunk other than `MTrk` where a track was expected
    #[error("Expected an MTrk chunk at position {position}, found {found:?}")]
    UnexpectedChunk {
        /// Start of the chunk
        position: usize,
        /// Its type tag
        found: [char; 4],
    },
    /// The file ended early
    #[error(transparent)]
    Read(#[from] ReadError),
    /// Error decoding a track's events
    #[error("Track {index} (data at position {offset}): {source}")]
    Track {
        /// Index of the track chunk
        index: usize,
        /// Position of the chunk's data in the file
        offset: usize,
        /// What went wrong inside the track
        source: TrackError,
    },
}

/// Broad classes of parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A read or a chunk ran past the end of the file
    OutOfBounds,
    /// The bytes do not follow the Standard MIDI File structure
    InvalidFormat,
    /// A status byte whose payload cannot be skipped safely
    UnsupportedEvent,
}

impl ChunkParseError {
    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read(ReadError::OutOfBounds { .. }) => ErrorKind::OutOfBounds,
            Self::Track {
                source: TrackError::UnsupportedEvent { .. },
                ..
            } => ErrorKind::UnsupportedEvent,
            Self::Read(ReadError::CorruptVlq(_))
            | Self::InvalidFormat(_)
            | Self::UnexpectedChunk { .. }
            | Self::Track { .. } => ErrorKind::InvalidFormat,
        }
    }
}

/// Reads the chunk type tag at `position`
fn chunk_type_at(reader: &ByteReader<'_>, position: usize) -> Result<[char; 4], ReadError> {
    let tag = reader.bytes_at(position, 4)?;
    Ok([
        tag[0] as char,
        tag[1] as char,
        tag[2] as char,
        tag[3] as char,
    ])
}

/// Parses the `MThd` chunk at the start of the file, returning it and the position just past it
pub fn parse_header(bytes: &[u8]) -> Result<(HeaderChunk, usize), ChunkParseError> {
    let reader = ByteReader::new(bytes);

    let tag = chunk_type_at(&reader, 0)?;
    if tag != HEADER_CHUNK {
        return Err(InvalidFormat::MissingHeader(tag).into());
    }

    let (chunk, next) = parse_next_chunk(bytes, 0)?;
    if chunk.length < HEADER_DATA_LEN {
        return Err(InvalidFormat::HeaderLength(chunk.length).into());
    }
    if chunk.length > HEADER_DATA_LEN {
        warn!(length = chunk.length, "header chunk is longer than 6 bytes, skipping the rest");
    }

    let offset = chunk.offset();
    let format = reader.u16_at(offset)?;
    let ntrks = reader.u16_at(offset + 2)?;
    let division = reader.u16_at(offset + 4)?;

    let header = HeaderChunk::try_from((format, ntrks, division))?;
    Ok((header, next))
}

/// Reads the chunk prefix at `position`. The chunk's data is exactly `length` bytes after the
/// prefix and must fit in the buffer. Returns the chunk and the position of the next one.
pub fn parse_next_chunk(bytes: &[u8], position: usize) -> Result<(Chunk, usize), ChunkParseError> {
    let reader = ByteReader::new(bytes);

    let chunk_type = chunk_type_at(&reader, position)?;
    let length = reader.u32_at(position + 4)?;
    let offset = position + CHUNK_PREFIX_LEN;

    // Make sure the data is actually there
    reader.bytes_at(offset, length as usize)?;

    let chunk = Chunk {
        chunk_type,
        length,
        offset,
    };

    Ok((chunk, offset + chunk.len()))
}

/// Like [`parse_next_chunk`] but the chunk must be an `MTrk`
pub fn parse_track_chunk(bytes: &[u8], position: usize) -> Result<(Chunk, usize), ChunkParseError> {
    let (chunk, next) = parse_next_chunk(bytes, position)?;

    if chunk.chunk_type != TRACK_DATA_CHUNK {
        return Err(ChunkParseError::UnexpectedChunk {
            position,
            found: chunk.chunk_type,
        });
    }

    Ok((chunk, next))
}

#[cfg(test)]
mod tests {
    use super::{
        header::{Division, Format, InvalidFormat},
        parse_header, parse_next_chunk, parse_track_chunk, ChunkParseError, ErrorKind,
    };
    use crate::{chunk::track::TrackError, reader::ReadError};

    const HEADER: [u8; 14] = [
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, // prefix
        0, 1, 0, 2, 0x01, 0xE0, // format 1, 2 tracks, 480 ticks
    ];

    #[test]
    fn header_chunk_reads_properly() {
        let (header, next) = parse_header(&HEADER).expect("Parse header");

        assert_eq!(header.format(), Format::One);
        assert_eq!(header.track_count(), 2);
        assert_eq!(header.division(), Division::Metrical(480));
        assert_eq!(next, 14);
    }

    #[test]
    fn missing_magic_is_invalid_format() {
        let mut bytes = HEADER;
        bytes[3] = b'x';

        let error = parse_header(&bytes).expect_err("Reject bad magic");
        assert_eq!(
            error,
            ChunkParseError::InvalidFormat(InvalidFormat::MissingHeader(['M', 'T', 'h', 'x']))
        );
        assert_eq!(error.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn short_header_is_rejected() {
        let bytes = [b'M', b'T', b'h', b'd', 0, 0, 0, 4, 0, 1, 0, 2];

        assert_eq!(
            parse_header(&bytes),
            Err(InvalidFormat::HeaderLength(4).into())
        )
    }

    #[test]
    fn longer_header_skips_extra_bytes() {
        let bytes = [
            b'M', b'T', b'h', b'd', 0, 0, 0, 8, 0, 0, 0, 1, 0, 96, 0xAA, 0xBB,
        ];

        let (header, next) = parse_header(&bytes).expect("Parse long header");
        assert_eq!(header.ticks_per_quarter_note(), Some(96));
        assert_eq!(next, 16);
    }

    #[test]
    fn chunk_range_is_exactly_its_length() {
        let bytes = [b'M', b'T', b'r', b'k', 0, 0, 0, 2, 0xAA, 0xBB, 0xCC];

        let (chunk, next) = parse_next_chunk(&bytes, 0).expect("Parse chunk");
        assert_eq!(chunk.data_range(), 8..10);
        assert_eq!(next, 10);
    }

    #[test]
    fn chunk_past_the_buffer_is_out_of_bounds() {
        let bytes = [b'M', b'T', b'r', b'k', 0, 0, 0, 9, 0xAA];

        let error = parse_next_chunk(&bytes, 0).expect_err("Reject truncated chunk");
        assert_eq!(
            error,
            ChunkParseError::Read(ReadError::OutOfBounds {
                position: 8,
                len: 9
            })
        );
        assert_eq!(error.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn unexpected_track_tag_is_rejected() {
        let bytes = [b'X', b'Y', b'Z', b'W', 0, 0, 0, 0];

        assert_eq!(
            parse_track_chunk(&bytes, 0),
            Err(ChunkParseError::UnexpectedChunk {
                position: 0,
                found: ['X', 'Y', 'Z', 'W']
            })
        )
    }

    #[test]
    fn unsupported_events_are_classified() {
        let error = ChunkParseError::Track {
            index: 0,
            offset: 22,
            source: TrackError::UnsupportedEvent {
                status: 0xF4,
                position: 1,
            },
        };

        assert_eq!(error.kind(), ErrorKind::UnsupportedEvent);
    }
}

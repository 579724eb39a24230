//! # karaoke-midi
//!
//! A Standard MIDI File parser and event timeline built for karaoke style playback. Raw file bytes
//! become structured chunks and tick relative events, every track is merged into one tempo aware
//! sequence in absolute seconds, and a playback clock walks that sequence against a wall clock.
//!
//! ## Overview
//!
//! MIDI files are structured as a series of chunks. Each chunk contains a 4-character ASCII
//! type identifier and a 32-bit length that specifies how many bytes of data follow. The
//! [`Chunk`] struct and the [`chunk`] module parse the framing, [`chunk::track`] decodes the
//! events inside each `MTrk` chunk, including running status and lyric text in legacy encodings.
//!
//! - **[`timeline`]**: merges the tracks into [`timeline::TimedEvent`]s ordered by absolute time
//!   and extracts the lyric cues.
//! - **[`playback`]**: a small state machine that reports which events fall due on each tick.
//! - **[`player`]**: wires the clock to injected audio and lyric sinks.
//!
//! ## Example Usage
//!
//! ```rust
//! use karaoke_midi::{reader::MidiReadable, timeline, ParsedMidi};
//!
//! let bytes = "test/karaoke.mid"
//!     .get_midi_bytes()
//!     .expect("Read `karaoke.mid`");
//!
//! let midi = ParsedMidi::parse(&bytes).expect("Parse karaoke file");
//! let song = timeline::schedule(&midi, None);
//! let lyrics = timeline::lyrics::extract_lyrics(&song);
//!
//! for cue in &lyrics {
//!     println!("{:>6.2}s {}", cue.time_seconds(), cue.text());
//! }
//! ```

use std::ops::Range;

use chunk::{header::HeaderChunk, track::TrackChunk, ChunkParseError};
use reader::ByteReader;
use tracing::debug;

pub mod chunk;
pub mod playback;
pub mod player;
pub mod reader;
pub mod timeline;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a raw MIDI Chunk.
/// A MIDI Chunk consists of a 4-character ASCII type identifier and a 32-bit unsigned integer
/// specifying the length of its data, located at `offset` in the file.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Chunk {
    /// 4 character ASCII chunk type
    pub chunk_type: [char; 4],
    /// Length of the data that follows
    pub(crate) length: u32,
    /// Position of the chunk's data in the file
    pub(crate) offset: usize,
}

impl Chunk {
    /// Gets the length of the chunk as a usize
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Returns if the chunk has no attributed data
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Position of the chunk's data in the file
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte range of the chunk's data in the file
    pub fn data_range(&self) -> Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// A fully parsed file: the header and each track's events
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParsedMidi {
    /// File header
    header: HeaderChunk,
    /// Tracks in file order
    tracks: Vec<TrackChunk>,
}

impl ParsedMidi {
    /// Builds a file from parts
    pub fn new(header: HeaderChunk, tracks: Vec<TrackChunk>) -> Self {
        Self { header, tracks }
    }

    /// Parses a whole file. The header is followed by exactly as many `MTrk` chunks as it
    /// declares, anything after them is ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self, ChunkParseError> {
        let (header, mut position) = chunk::parse_header(bytes)?;
        let reader = ByteReader::new(bytes);
        let mut tracks = Vec::with_capacity(header.track_count() as usize);

        for index in 0..header.track_count() as usize {
            let (chunk, next) = chunk::parse_track_chunk(bytes, position)?;
            let data = reader.bytes_at(chunk.offset(), chunk.len())?;

            let track = TrackChunk::try_from(data).map_err(|source| ChunkParseError::Track {
                index,
                offset: chunk.offset(),
                source,
            })?;

            debug!(index, events = track.len(), "decoded track");
            tracks.push(track);
            position = next;
        }

        if position < bytes.len() {
            debug!(
                trailing = bytes.len() - position,
                "ignoring bytes after the last track"
            );
        }

        Ok(Self { header, tracks })
    }

    /// File header
    pub fn header(&self) -> &HeaderChunk {
        &self.header
    }

    /// Tracks in file order
    pub fn tracks(&self) -> &[TrackChunk] {
        &self.tracks
    }
}

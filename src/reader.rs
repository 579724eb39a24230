//! MIDI byte reading, allows for in memory byte spans or files to be loaded and walked with a
//! bounds checked cursor

use std::{convert::Infallible, fs, path::Path};

use thiserror::Error;

/// Largest value a MIDI variable length quantity may carry (28 bits)
pub const VLQ_MAX: u32 = 0x0FFF_FFFF;

/// Most bytes a variable length quantity may occupy
const VLQ_MAX_BYTES: usize = 4;

/// Errors from reading raw bytes
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// A read would run past the end of the buffer
    #[error("Read of {len} byte(s) at position {position} runs past the end of the buffer")]
    OutOfBounds {
        /// Where the read started
        position: usize,
        /// How many bytes were requested
        len: usize,
    },
    /// A variable length quantity still had its continuation bit set on its 4th byte
    #[error("Variable length quantity at position {0} is longer than 4 bytes")]
    CorruptVlq(usize),
}

/// Trait that allows for different types to be translated to a MIDI parseable buffer
pub trait MidiReadable {
    /// Error type that may be returned while loading the bytes
    type Error;
    /// Loads the full byte buffer
    fn get_midi_bytes(self) -> Result<Vec<u8>, Self::Error>;
}

/// Wrapper struct to allow passing `Vec<u8>` to the [`MidiReadable`] trait
pub struct MidiData(pub Vec<u8>);

impl MidiReadable for MidiData {
    type Error = Infallible;
    fn get_midi_bytes(self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.0)
    }
}

impl<PATH> MidiReadable for PATH
where
    PATH: AsRef<Path>,
{
    type Error = std::io::Error;
    fn get_midi_bytes(self) -> Result<Vec<u8>, Self::Error> {
        fs::read(self.as_ref())
    }
}

/// A cursor over a borrowed byte buffer. All multi-byte values are big endian.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    /// The whole buffer
    data: &'a [u8],
    /// Offset of the next cursor read
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor to an absolute position. Positions past the end are allowed, the next
    /// read will fail.
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Number of bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Returns true once the cursor has reached the end of the buffer
    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Borrows `len` bytes starting at `position`
    pub fn bytes_at(&self, position: usize, len: usize) -> Result<&'a [u8], ReadError> {
        position
            .checked_add(len)
            .and_then(|end| self.data.get(position..end))
            .ok_or(ReadError::OutOfBounds { position, len })
    }

    /// Reads a byte at `position`
    pub fn u8_at(&self, position: usize) -> Result<u8, ReadError> {
        Ok(self.bytes_at(position, 1)?[0])
    }

    /// Reads a big endian u16 at `position`
    pub fn u16_at(&self, position: usize) -> Result<u16, ReadError> {
        let bytes = self.bytes_at(position, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big endian u32 at `position`
    pub fn u32_at(&self, position: usize) -> Result<u32, ReadError> {
        let bytes = self.bytes_at(position, 4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a variable length quantity at `position`, returning the value and how many bytes it
    /// took up
    pub fn vlq_at(&self, position: usize) -> Result<(u32, usize), ReadError> {
        let mut value: u32 = 0;

        for consumed in 1..=VLQ_MAX_BYTES {
            let byte = self.u8_at(position + consumed - 1)?;
            value = (value << 7) | (byte & 0x7F) as u32;

            if byte & 0x80 == 0 {
                return Ok((value, consumed));
            }
        }

        Err(ReadError::CorruptVlq(position))
    }

    /// Reads the byte under the cursor without advancing
    pub fn peek_u8(&self) -> Result<u8, ReadError> {
        self.u8_at(self.position)
    }

    /// Reads a byte and advances
    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        let value = self.u8_at(self.position)?;
        self.position += 1;
        Ok(value)
    }

    /// Reads a big endian u16 and advances
    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        let value = self.u16_at(self.position)?;
        self.position += 2;
        Ok(value)
    }

    /// Reads a big endian u32 and advances
    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        let value = self.u32_at(self.position)?;
        self.position += 4;
        Ok(value)
    }

    /// Reads a variable length quantity and advances past it
    pub fn read_vlq(&mut self) -> Result<u32, ReadError> {
        let (value, consumed) = self.vlq_at(self.position)?;
        self.position += consumed;
        Ok(value)
    }

    /// Borrows the next `len` bytes and advances past them
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        let bytes = self.bytes_at(self.position, len)?;
        self.position += len;
        Ok(bytes)
    }
}

/// Encodes a value as a MIDI variable length quantity. Values are masked to 28 bits.
pub fn encode_vlq(value: u32) -> Vec<u8> {
    let mut value = value & VLQ_MAX;
    let mut bytes = Vec::with_capacity(VLQ_MAX_BYTES);

    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if !bytes.is_empty() {
            byte |= 0x80;
        }

        bytes.push(byte);

        if value == 0 {
            break;
        }
    }

    bytes.reverse();
    bytes
}

#[cfg(test)]
mod tests {
    use super::{encode_vlq, ByteReader, MidiData, MidiReadable, ReadError, VLQ_MAX};

    #[test]
    fn midi_files_load() {
        let data = "test/karaoke.mid".get_midi_bytes();

        assert!(data.is_ok())
    }

    #[test]
    fn owned_buffers_load_unchanged() {
        let bytes = MidiData(vec![1, 2, 3]).get_midi_bytes();
        assert_eq!(bytes, Ok(vec![1, 2, 3]))
    }

    #[test]
    fn fixed_width_reads_are_big_endian() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let reader = ByteReader::new(&data);

        assert_eq!(reader.u8_at(1), Ok(0x34));
        assert_eq!(reader.u16_at(0), Ok(0x1234));
        assert_eq!(reader.u32_at(0), Ok(0x1234_5678));
    }

    #[test]
    fn reads_past_the_end_are_out_of_bounds() {
        let data = [0x00, 0x01];
        let mut reader = ByteReader::new(&data);

        assert_eq!(
            reader.u32_at(0),
            Err(ReadError::OutOfBounds {
                position: 0,
                len: 4
            })
        );

        reader.seek(2);
        assert_eq!(
            reader.read_u8(),
            Err(ReadError::OutOfBounds {
                position: 2,
                len: 1
            })
        );
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn delta_time_parsed() {
        let bytes = [0x81, 0x40];
        let reader = ByteReader::new(&bytes);

        assert_eq!(reader.vlq_at(0), Ok((192, 2)))
    }

    #[test]
    fn delta_time_backwards_parsed() {
        let bytes = encode_vlq(192);
        let expected = vec![0x81, 0x40];

        assert_eq!(bytes, expected)
    }

    #[test]
    fn vlq_round_trips_across_byte_lengths() {
        let cases = [
            (0, 1),
            (0x7F, 1),
            (0x80, 2),
            (0x3FFF, 2),
            (0x4000, 3),
            (0x1F_FFFF, 3),
            (0x20_0000, 4),
            (VLQ_MAX, 4),
        ];

        for (value, len) in cases {
            let encoded = encode_vlq(value);
            assert_eq!(encoded.len(), len, "encoded length of {value:#X}");

            let reader = ByteReader::new(&encoded);
            assert_eq!(reader.vlq_at(0), Ok((value, len)), "decoding {value:#X}");
        }
    }

    #[test]
    fn fifth_vlq_byte_is_corrupt() {
        let bytes = [0x81, 0x81, 0x81, 0x81, 0x01];
        let reader = ByteReader::new(&bytes);

        assert_eq!(reader.vlq_at(0), Err(ReadError::CorruptVlq(0)))
    }

    #[test]
    fn truncated_vlq_is_out_of_bounds() {
        let bytes = [0x00, 0x81];
        let mut reader = ByteReader::new(&bytes);

        assert_eq!(reader.read_vlq(), Ok(0));
        assert_eq!(
            reader.read_vlq(),
            Err(ReadError::OutOfBounds {
                position: 2,
                len: 1
            })
        );
    }

    #[test]
    fn cursor_reads_advance() {
        let data = [0xFF, 0x00, 0x10, 0x83, 0x00, 0xAA, 0xBB];
        let mut reader = ByteReader::new(&data);

        assert_eq!(reader.peek_u8(), Ok(0xFF));
        assert_eq!(reader.read_u8(), Ok(0xFF));
        assert_eq!(reader.read_u16(), Ok(0x0010));
        assert_eq!(reader.read_vlq(), Ok(0x180));
        assert_eq!(reader.read_bytes(2), Ok(&[0xAA, 0xBB][..]));
        assert!(reader.is_at_end());
        assert_eq!(reader.remaining(), 0);
    }
}

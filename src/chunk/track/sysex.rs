//! System Exclusive Messages

use tracing::trace;

use super::TrackError;
use crate::reader::ByteReader;

/// Skips the payload of a `0xF0` or `0xF7` event. In a file these carry a variable length
/// quantity length rather than relying on a trailing `0xF7`. Returns the skipped length.
pub fn skip(reader: &mut ByteReader<'_>) -> Result<usize, TrackError> {
    let len = reader.read_vlq()? as usize;
    reader.read_bytes(len)?;

    trace!(len, "skipped system exclusive payload");
    Ok(len)
}

//! Meta event text decoding. Karaoke files are frequently authored in legacy single byte
//! encodings, so decoding falls back instead of failing.

use encoding_rs::WINDOWS_1251;
use tracing::debug;

/// Decodes a text payload: UTF-8, then Windows-1251, then Latin-1. Never fails.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_owned();
    }

    if let Some(text) = WINDOWS_1251.decode_without_bom_handling_and_without_replacement(bytes) {
        debug!(len = bytes.len(), "meta text is not UTF-8, decoded as Windows-1251");
        return text.into_owned();
    }

    debug!(len = bytes.len(), "meta text decoded as Latin-1");
    latin1(bytes)
}

/// Maps every byte to the code point of the same value
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| byte as char).collect()
}

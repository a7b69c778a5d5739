//! 16/17-byte identifiers and the hex codec used on the wire.
//!
//! Ids are 16 raw bytes. A 17-byte variant adds a single discriminator byte
//! and exists only so that a value can be used as a hash key distinguishing,
//! e.g., a playlist-checksum input from a track-checksum input (see
//! `playlist.c`'s use of 17-byte ids everywhere a playlist is addressed).

use std::fmt;

/// Raw 16-byte identifier (tracks, albums, artists, images).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identifier(pub [u8; 16]);

/// 17-byte identifier: a 16-byte id plus a discriminator byte.
///
/// Used as the playlist/container key. The discriminator is not part of the
/// id's identity in the protocol payload (which carries the raw 17 bytes
/// verbatim); it only matters when the value is hashed alongside ids of a
/// different kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identifier17(pub [u8; 17]);

impl Identifier {
    pub const LEN: usize = 16;
    pub const ZERO: Identifier = Identifier([0u8; 16]);

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN {
            return None;
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(bytes);
        Some(Identifier(buf))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Builds the 17-byte keyed form by appending `discriminator`.
    pub fn with_discriminator(&self, discriminator: u8) -> Identifier17 {
        let mut buf = [0u8; 17];
        buf[..16].copy_from_slice(&self.0);
        buf[16] = discriminator;
        Identifier17(buf)
    }
}

impl Identifier17 {
    pub const LEN: usize = 17;
    pub const ZERO: Identifier17 = Identifier17([0u8; 17]);

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN {
            return None;
        }
        let mut buf = [0u8; 17];
        buf.copy_from_slice(bytes);
        Some(Identifier17(buf))
    }

    pub fn as_bytes(&self) -> &[u8; 17] {
        &self.0
    }

    /// Strips the discriminator byte, returning the raw 16-byte id.
    pub fn without_discriminator(&self) -> Identifier {
        Identifier(self.0[..16].try_into().unwrap())
    }

    pub fn discriminator(&self) -> u8 {
        self.0[16]
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bytes_to_hex(&self.0))
    }
}

impl fmt::Display for Identifier17 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bytes_to_hex(&self.0))
    }
}

/// Encodes bytes as lowercase hex, matching `hex_bytes_to_ascii` on the wire.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes a hex string into bytes. Returns `None` on malformed input
/// (odd length or non-hex characters), matching `hex_ascii_to_bytes`'s
/// validation in spirit.
pub fn hex_to_bytes(s: &str) -> Option<Vec<u8>> {
    hex::decode(s).ok()
}

/// Parses a comma/newline separated list of 34-hex-character (17-byte)
/// ids, the format used by `<items>` elements in playlist/container XML.
pub fn parse_id17_list(text: &str) -> Vec<Identifier17> {
    text.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| hex_to_bytes(s).and_then(|b| Identifier17::from_slice(&b)))
        .collect()
}

/// Parses a comma/newline separated list of 32-hex-character (16-byte) ids,
/// the format used for track id lists within a playlist's `<add><items>`.
pub fn parse_id16_list(text: &str) -> Vec<Identifier> {
    text.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| hex_to_bytes(s).and_then(|b| Identifier::from_slice(&b)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_bytes_then_string() {
        let raw = [0xaau8, 0xbb, 0x00, 0xff, 0x01];
        let hex = bytes_to_hex(&raw);
        let back = hex_to_bytes(&hex).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn hex_round_trip_string_then_bytes() {
        let s = "00ff10aa";
        let bytes = hex_to_bytes(s).unwrap();
        assert_eq!(bytes_to_hex(&bytes), s);
    }

    #[test]
    fn hex_rejects_odd_length() {
        assert!(hex_to_bytes("abc").is_none());
    }

    #[test]
    fn id17_strips_discriminator() {
        let id = Identifier([0x11; 16]);
        let keyed = id.with_discriminator(0x02);
        assert_eq!(keyed.discriminator(), 0x02);
        assert_eq!(keyed.without_discriminator(), id);
    }

    #[test]
    fn parses_comma_and_newline_separated_id17_list() {
        let a = "aa".repeat(16) + "01";
        let b = "bb".repeat(16) + "01";
        let text = format!("{},{}\n", a, b);
        let ids = parse_id17_list(&text);
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].discriminator(), 1);
    }

    #[test]
    fn skips_malformed_entries_in_id_list() {
        let a = "aa".repeat(16) + "01";
        let text = format!("{},not-hex,", a);
        let ids = parse_id17_list(&text);
        assert_eq!(ids.len(), 1);
    }
}

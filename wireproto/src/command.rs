//! Command dispatch (spec §4.F / §6).
//!
//! Encoders that build a framed command packet and register a receiving
//! channel atomically. Framing here is the command packet's own
//! `{cmd, payload_len, payload}` shape (spec §6); socket-level encryption is
//! the IO worker's job and is not this module's concern.

use crate::channel::{ChannelCallback, ChannelTable};
use crate::ident::{Identifier, Identifier17};

/// Command codes relevant to this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    GetPlaylist = 0x76,
    ChangePlaylist = 0x77,
    /// Metadata browse (album/artist/track). The source's BROWSE command
    /// family isn't given an explicit wire layout in the playlist/container
    /// encoders above, since browse isn't one of the "only two" playlist
    /// encoders the core originally names — this is the minimal framing
    /// needed to make the browse driver (spec §4.H) concrete, following the
    /// same `{u8 cmd, u16 payload_len, payload}` packet shape.
    Browse = 0x30,
}

/// Which kind of entity a BROWSE command fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BrowseKind {
    Artist = 1,
    Album = 2,
    Track = 3,
}

/// "All revisions" mask: requests the full playlist/container state.
pub const REVISION_MASK_ALL: u32 = 0xFFFF_FFFF;

/// Encodes a single command packet: `{u8 cmd, u16 payload_len, payload}`.
pub fn encode_packet(cmd: CommandCode, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + payload.len());
    out.push(cmd as u8);
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Builds the `GETPLAYLIST` payload: 17-byte id (zero for the container),
/// 32-bit revision mask, two trailing zero bytes.
pub fn build_get_playlist_payload(id: Identifier17, revision_mask: u32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(17 + 4 + 2);
    payload.extend_from_slice(id.as_bytes());
    payload.extend_from_slice(&revision_mask.to_be_bytes());
    payload.extend_from_slice(&[0u8, 0u8]);
    payload
}

/// Builds the `CHANGEPLAYLIST` payload: 17-byte id, base revision, track
/// count, checksum, shared flag, followed by the ops XML.
pub fn build_change_playlist_payload(
    id: Identifier17,
    xml_ops: &[u8],
    base_revision: u32,
    num_tracks: u32,
    checksum: u32,
    shared: bool,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(17 + 4 + 4 + 4 + 1 + xml_ops.len());
    payload.extend_from_slice(id.as_bytes());
    payload.extend_from_slice(&base_revision.to_be_bytes());
    payload.extend_from_slice(&num_tracks.to_be_bytes());
    payload.extend_from_slice(&checksum.to_be_bytes());
    payload.push(shared as u8);
    payload.extend_from_slice(xml_ops);
    payload
}

/// Builds a BROWSE payload: `{u8 kind, u16 id_count, id_count * 16-byte id}`.
pub fn build_browse_payload(kind: BrowseKind, ids: &[Identifier]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(1 + 2 + ids.len() * Identifier::LEN);
    payload.push(kind as u8);
    payload.extend_from_slice(&(ids.len() as u16).to_be_bytes());
    for id in ids {
        payload.extend_from_slice(id.as_bytes());
    }
    payload
}

/// `cmd_browse`: registers `callback` on a fresh channel and returns the
/// framed BROWSE packet the IO worker must write to the socket.
pub fn cmd_browse(
    channels: &mut ChannelTable,
    kind: BrowseKind,
    ids: &[Identifier],
    callback: Box<dyn ChannelCallback>,
) -> (u16, Vec<u8>) {
    let channel_id = channels.register("browse", callback);
    let payload = build_browse_payload(kind, ids);
    (channel_id, encode_packet(CommandCode::Browse, &payload))
}

/// `cmd_get_playlist`: registers `callback` on a fresh channel and returns
/// the framed packet the IO worker must write to the socket.
pub fn cmd_get_playlist(
    channels: &mut ChannelTable,
    id: Identifier17,
    revision_mask: u32,
    callback: Box<dyn ChannelCallback>,
) -> (u16, Vec<u8>) {
    let channel_id = channels.register("get-playlist", callback);
    let payload = build_get_playlist_payload(id, revision_mask);
    (channel_id, encode_packet(CommandCode::GetPlaylist, &payload))
}

/// `cmd_change_playlist`: registers `callback` on a fresh channel and
/// returns the framed packet the IO worker must write to the socket.
#[allow(clippy::too_many_arguments)]
pub fn cmd_change_playlist(
    channels: &mut ChannelTable,
    id: Identifier17,
    xml_ops: &[u8],
    base_revision: u32,
    num_tracks: u32,
    checksum: u32,
    shared: bool,
    callback: Box<dyn ChannelCallback>,
) -> (u16, Vec<u8>) {
    let channel_id = channels.register("change-playlist", callback);
    let payload = build_change_playlist_payload(id, xml_ops, base_revision, num_tracks, checksum, shared);
    (channel_id, encode_packet(CommandCode::ChangePlaylist, &payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Terminal;

    struct NoopCallback;
    impl ChannelCallback for NoopCallback {
        fn on_chunk(&mut self, _payload: &[u8]) {}
        fn on_terminal(&mut self, _outcome: Terminal) {}
    }

    #[test]
    fn get_playlist_payload_shape() {
        let id = Identifier17([0u8; 17]);
        let payload = build_get_playlist_payload(id, REVISION_MASK_ALL);
        assert_eq!(payload.len(), 17 + 4 + 2);
        assert_eq!(&payload[17..21], &REVISION_MASK_ALL.to_be_bytes());
        assert_eq!(&payload[21..23], &[0, 0]);
    }

    #[test]
    fn change_playlist_payload_carries_ops_blob() {
        let id = Identifier17([0x42; 17]);
        let ops = b"<ops><name>Mix</name></ops>";
        let payload = build_change_playlist_payload(id, ops, 3, 5, 0xabc, true);
        assert_eq!(&payload[0..17], id.as_bytes());
        assert_eq!(&payload[17..21], &3u32.to_be_bytes());
        assert_eq!(&payload[21..25], &5u32.to_be_bytes());
        assert_eq!(&payload[25..29], &0xabcu32.to_be_bytes());
        assert_eq!(payload[29], 1u8);
        assert_eq!(&payload[30..], ops);
    }

    #[test]
    fn cmd_get_playlist_registers_channel_and_frames_packet() {
        let mut channels = ChannelTable::new();
        let (channel_id, packet) =
            cmd_get_playlist(&mut channels, Identifier17::ZERO, REVISION_MASK_ALL, Box::new(NoopCallback));
        assert_eq!(packet[0], CommandCode::GetPlaylist as u8);
        assert!(channels.state_of(channel_id).is_some());
    }

    #[test]
    fn browse_payload_carries_kind_and_ids() {
        let ids = [Identifier([1u8; 16]), Identifier([2u8; 16])];
        let payload = build_browse_payload(BrowseKind::Album, &ids);
        assert_eq!(payload[0], BrowseKind::Album as u8);
        assert_eq!(&payload[1..3], &2u16.to_be_bytes());
        assert_eq!(&payload[3..19], ids[0].as_bytes());
        assert_eq!(&payload[19..35], ids[1].as_bytes());
    }

    #[test]
    fn cmd_browse_registers_channel_and_frames_packet() {
        let mut channels = ChannelTable::new();
        let (channel_id, packet) = cmd_browse(&mut channels, BrowseKind::Track, &[], Box::new(NoopCallback));
        assert_eq!(packet[0], CommandCode::Browse as u8);
        assert!(channels.state_of(channel_id).is_some());
    }
}

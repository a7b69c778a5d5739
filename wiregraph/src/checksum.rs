//! Playlist and container checksums (spec invariants 4-5).
//!
//! Both fold each member's 16-byte id plus a fixed discriminator byte
//! through Adler-32, seeded at 1 with an empty sequence hashing to 1
//! (grounded in `playlist.c`'s `playlist_checksum` /
//! `playlistcontainer_checksum`, which tag track ids with `0x01` and
//! playlist ids with `0x02` respectively so the two checksum spaces never
//! collide on the same byte sequence).

use crate::playlist::Playlist;
use std::sync::Arc;
use wireproto::Adler32;

const TRACK_DISCRIMINATOR: u8 = 0x01;
const PLAYLIST_DISCRIMINATOR: u8 = 0x02;

pub fn playlist_checksum(tracks: &[Arc<crate::track::Track>]) -> u32 {
    let mut state = Adler32::new();
    for track in tracks {
        let keyed = track.id.with_discriminator(TRACK_DISCRIMINATOR);
        state.update(keyed.as_bytes());
    }
    state.finish()
}

pub fn container_checksum<S>(playlists: &[Arc<Playlist<S>>]) -> u32 {
    let mut state = Adler32::new();
    for playlist in playlists {
        let raw = playlist.id.without_discriminator();
        let keyed = raw.with_discriminator(PLAYLIST_DISCRIMINATOR);
        state.update(keyed.as_bytes());
    }
    state.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Track;
    use std::sync::Weak;
    use wireproto::{Identifier, Identifier17};

    #[test]
    fn empty_sequence_checksums_to_one() {
        assert_eq!(playlist_checksum(&[]), 1);
        assert_eq!(container_checksum::<()>(&[]), 1);
    }

    #[test]
    fn playlist_checksum_is_order_sensitive() {
        let a = Arc::new(Track::new(Identifier([1u8; 16])));
        let b = Arc::new(Track::new(Identifier([2u8; 16])));
        let forward = playlist_checksum(&[a.clone(), b.clone()]);
        let backward = playlist_checksum(&[b, a]);
        assert_ne!(forward, backward);
    }

    #[test]
    fn container_checksum_uses_playlist_discriminator() {
        let id = Identifier17([3u8; 17]);
        let p: Arc<Playlist<()>> = Arc::new(Playlist::new(id, Weak::new()));
        let checksum = container_checksum(&[p]);
        assert_ne!(checksum, 1);
    }
}

//! Browse dispatch (spec §4.H "Browse dispatch"): the single driver shared
//! by `BROWSE_ALBUM`/`BROWSE_ARTIST`/`BROWSE_TRACK`/`BROWSE_PLAYLIST_TRACKS`.
//!
//! Mirrors `osfy_playlist_browse`/`osfy_playlist_browse_callback`'s shape
//! (batch ids up to a cap, send, collect, inflate+parse, apply per-kind,
//! decrement the in-request count, complete when `num_browsed ==
//! num_total`) even though the original's `browse.c`/`track.c` aren't in
//! the retrieved source; entity field names below follow what
//! `sp_artist.c`'s `osfy_artist_load_artist_from_xml`/
//! `osfy_artist_load_track_artist_from_xml` actually parse (`id`, `name`,
//! `artist-id`/`artist` pairs).

use crate::error::{Result, WireError};
use crate::request::{RequestInput, RequestKind, RequestOutput};
use crate::session::Session;
use crate::xml_util::{parse_xml, splice_document, XmlNode};
use std::sync::{Arc, Mutex};
use wireproto::channel::{ChannelCallback, Terminal};
use wireproto::{cmd_browse, now_ms, BrowseKind, GrowBuffer, Identifier};
use wiregraph::{Availability, Playlist, PlaylistState};

/// Upper bound on ids carried in a single BROWSE packet (spec §4.H: "up to
/// a protocol-defined maximum per request").
pub const MAX_BROWSE_BATCH: usize = 50;

/// A browse's continuation state, kept alive in `Session::browse_retries`
/// across sub-batches and across a transient-error retry (spec §4.D: a
/// failed channel reschedules the owning request rather than failing it).
pub(crate) struct BrowseState {
    session: Arc<Session>,
    req_id: u64,
    kind: BrowseKind,
    remaining: Vec<Identifier>,
    in_flight: Vec<Identifier>,
    num_total: usize,
    num_done: usize,
    /// Set only for `BROWSE_PLAYLIST_TRACKS`: the playlist whose state
    /// advances to `LOADED` once every batch lands (spec §4.H "Playlist
    /// load" state machine: "`LISTED -> LOADED` on successful
    /// `BROWSE_PLAYLIST_TRACKS`").
    playlist: Option<Arc<Playlist<Session>>>,
}

/// Starts a browse over `ids` for `kind`, owned by request `req_id`. First
/// batch is sent immediately; remaining batches are chained from the
/// channel callback as each prior batch completes.
pub(crate) fn start_browse(session: &Arc<Session>, req_id: u64, kind: BrowseKind, ids: Vec<Identifier>) {
    start_browse_for_playlist(session, req_id, kind, ids, None)
}

/// Same as `start_browse`, but advances `playlist` to `LOADED` and posts a
/// `PLAYLIST_STATE_CHANGED` notification once the whole batch completes
/// (used for `BROWSE_PLAYLIST_TRACKS`).
pub(crate) fn start_browse_for_playlist(
    session: &Arc<Session>,
    req_id: u64,
    kind: BrowseKind,
    ids: Vec<Identifier>,
    playlist: Option<Arc<Playlist<Session>>>,
) {
    let num_total = ids.len();
    if num_total == 0 {
        finish(session, req_id, playlist);
        return;
    }
    let state = Arc::new(Mutex::new(BrowseState {
        session: session.clone(),
        req_id,
        kind,
        remaining: ids,
        in_flight: Vec::new(),
        num_total,
        num_done: 0,
        playlist,
    }));
    session.register_browse(req_id, state.clone());
    send_next_batch(&state);
}

fn finish(session: &Arc<Session>, req_id: u64, playlist: Option<Arc<Playlist<Session>>>) {
    if let Some(playlist) = playlist {
        playlist.advance_state(PlaylistState::Loaded);
        session.queue().post_result(
            RequestKind::PlaylistStateChanged,
            None,
            Some(RequestOutput::PlaylistStateChanged { playlist }),
        );
    }
    session
        .queue()
        .set_result(req_id, None, Some(RequestOutput::BrowseComplete));
}

/// Invoked by the IO worker when a previously-errored browse request
/// becomes runnable again (its `next_timeout_ms` has fired).
pub(crate) fn resume_browse(session: &Arc<Session>, req_id: u64) {
    if let Some(state) = session.lookup_browse(req_id) {
        send_next_batch(&state);
    }
}

fn send_next_batch(state: &Arc<Mutex<BrowseState>>) {
    let (session, kind, batch, req_id) = {
        let mut s = state.lock().unwrap();
        let take = s.remaining.len().min(MAX_BROWSE_BATCH);
        let batch: Vec<Identifier> = s.remaining.drain(..take).collect();
        s.in_flight = batch.clone();
        (s.session.clone(), s.kind, batch, s.req_id)
    };

    let callback = Box::new(BrowseCallback {
        state: state.clone(),
        buffer: GrowBuffer::new(),
    });
    let packet = {
        let mut channels = session.channels().lock().unwrap();
        let (_channel_id, packet) = cmd_browse(&mut channels, kind, &batch, callback);
        packet
    };
    session.stash_outbound(packet);
    session.queue().with_request(req_id, |r| r.next_timeout_ms = i64::MAX);
}

/// One in-flight BROWSE sub-batch's channel callback.
struct BrowseCallback {
    state: Arc<Mutex<BrowseState>>,
    buffer: GrowBuffer,
}

impl ChannelCallback for BrowseCallback {
    fn on_chunk(&mut self, payload: &[u8]) {
        self.buffer.append(payload);
    }

    fn on_terminal(&mut self, outcome: Terminal) {
        match outcome {
            Terminal::End => {
                let result = apply_browse_reply(&self.state, self.buffer.as_slice());
                let (session, req_id, done, total, playlist) = {
                    let mut s = self.state.lock().unwrap();
                    match &result {
                        Ok(()) => {
                            s.num_done += s.in_flight.len();
                            s.in_flight.clear();
                        }
                        Err(_) => {}
                    }
                    (s.session.clone(), s.req_id, s.num_done, s.num_total, s.playlist.clone())
                };
                match result {
                    Err(e) => {
                        session.unregister_browse(req_id);
                        session.queue().set_result(req_id, Some(e), None);
                    }
                    Ok(()) if done >= total => {
                        session.unregister_browse(req_id);
                        finish(&session, req_id, playlist);
                    }
                    Ok(()) => send_next_batch(&self.state),
                }
            }
            Terminal::Error => {
                let (session, req_id, retry_ms) = {
                    let mut s = self.state.lock().unwrap();
                    let redo = std::mem::take(&mut s.in_flight);
                    s.remaining.splice(0..0, redo);
                    (s.session.clone(), s.req_id, s.session.config().retry_ms.browse)
                };
                session
                    .queue()
                    .with_request(req_id, |r| r.next_timeout_ms = now_ms() + retry_ms as i64);
            }
        }
    }
}

/// Posts a `BROWSE_*` request for a single entity id (album/artist/track
/// lookups the embedding asked for directly).
pub fn browse_entity(session: &Arc<Session>, kind: RequestKind, id: Identifier) -> u64 {
    let input = match kind {
        RequestKind::BrowseAlbum => RequestInput::BrowseAlbum { id },
        RequestKind::BrowseArtist => RequestInput::BrowseArtist { id },
        RequestKind::BrowseTrack => RequestInput::BrowseTrack { id },
        _ => unreachable!("browse_entity called with non-browse kind"),
    };
    session.queue().post(kind, input)
}

fn apply_browse_reply(state: &Arc<Mutex<BrowseState>>, raw: &[u8]) -> Result<()> {
    let (session, kind) = {
        let s = state.lock().unwrap();
        (s.session.clone(), s.kind)
    };
    let root_tag = match kind {
        BrowseKind::Artist => "artists",
        BrowseKind::Album => "albums",
        BrowseKind::Track => "tracks",
    };
    let doc = splice_document(root_tag, raw);
    let tree = parse_xml(&doc)?;
    match kind {
        BrowseKind::Artist => apply_artists(&session, &tree),
        BrowseKind::Album => apply_albums(&session, &tree),
        BrowseKind::Track => apply_tracks(&session, &tree),
    }
}

fn parse_id(text: &str) -> Result<Identifier> {
    wireproto::hex_to_bytes(text)
        .and_then(|b| Identifier::from_slice(&b))
        .ok_or_else(|| WireError::parse_failure("malformed entity id"))
}

fn apply_artists(session: &Arc<Session>, tree: &XmlNode) -> Result<()> {
    for node in &tree.children {
        if node.name != "artist" {
            continue;
        }
        let id_text = node.text_at(&["id"]).ok_or_else(|| WireError::parse_failure("artist missing id"))?;
        let id = parse_id(id_text)?;
        let name = node.text_at(&["name"]).unwrap_or_default().to_string();
        let artist = session.intern_artist(id);
        artist.set_loaded(name);
    }
    Ok(())
}

fn apply_albums(session: &Arc<Session>, tree: &XmlNode) -> Result<()> {
    for node in &tree.children {
        if node.name != "album" {
            continue;
        }
        let id_text = node.text_at(&["id"]).ok_or_else(|| WireError::parse_failure("album missing id"))?;
        let id = parse_id(id_text)?;
        let name = node.text_at(&["name"]).unwrap_or_default().to_string();
        let year = node.text_at(&["year"]).and_then(|s| s.parse().ok());
        let cover = node.text_at(&["cover"]).and_then(|s| parse_id(s).ok());
        let artist_id = node.text_at(&["artist-id"]).and_then(|s| parse_id(s).ok());
        let artist_name = node.text_at(&["artist"]).unwrap_or_default().to_string();
        let artist = session.intern_artist(artist_id.unwrap_or(Identifier::ZERO));
        if !artist_name.is_empty() && !artist.is_loaded() {
            artist.set_loaded(artist_name);
        }
        let album = session.intern_album(id);
        album.set_loaded(name, artist, year, cover);
    }
    Ok(())
}

/// Applies one `<track>` node, interning the returned id and every id in
/// its `<redirect>` list against the *same* node (spec S5: "both the
/// returned id and each redirect id are interned and loaded from the same
/// XML node, with no duplicate handles").
fn apply_tracks(session: &Arc<Session>, tree: &XmlNode) -> Result<()> {
    for node in &tree.children {
        if node.name != "track" {
            continue;
        }
        let id_text = node.text_at(&["id"]).ok_or_else(|| WireError::parse_failure("track missing id"))?;
        let returned_id = parse_id(id_text)?;

        let title = node.text_at(&["title"]).unwrap_or_default().to_string();
        let album_id = node.text_at(&["album-id"]).and_then(|s| parse_id(s).ok());
        let artist_id = node.text_at(&["artist-id"]).and_then(|s| parse_id(s).ok());
        let artist_name = node.text_at(&["artist"]).unwrap_or_default().to_string();
        let duration_ms = node.text_at(&["duration"]).and_then(|s| s.parse().ok()).unwrap_or(0);
        let available = node.text_at(&["available"]).map(|s| s.trim() == "1").unwrap_or(false);
        let availability = if available {
            Availability::Available
        } else {
            Availability::NotPlayable
        };

        let artist = artist_id.map(|id| session.intern_artist(id));
        if let Some(artist) = &artist {
            if !artist_name.is_empty() && !artist.is_loaded() {
                artist.set_loaded(artist_name.clone());
            }
        }
        let album = album_id.map(|id| session.intern_album(id));

        let ids_to_load: Vec<Identifier> = std::iter::once(returned_id)
            .chain(node.get_path(&["redirect"]).into_iter().flat_map(|r| {
                r.children
                    .iter()
                    .filter(|c| c.name == "id")
                    .filter_map(|c| parse_id(&c.text).ok())
            }))
            .collect();

        for id in ids_to_load {
            let track = session.intern_track(id);
            track.set_loaded(
                title.clone(),
                artist.iter().cloned().collect(),
                album.clone(),
                duration_ms,
                availability,
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::session_init;

    fn test_session() -> Arc<Session> {
        session_init(serde_yaml::from_str(include_str!("default_config.yaml")).unwrap())
    }

    #[test]
    fn apply_artists_interns_and_loads() {
        let session = test_session();
        let id = Identifier([0x11; 16]);
        let hex = wireproto::bytes_to_hex(id.as_bytes());
        let fragment = format!("<artist><id>{hex}</id><name>Miles Davis</name></artist>");
        let doc = splice_document("artists", fragment.as_bytes());
        let tree = parse_xml(&doc).unwrap();
        apply_artists(&session, &tree).unwrap();
        let artist = session.intern_artist(id);
        assert!(artist.is_loaded());
        assert_eq!(artist.name(), "Miles Davis");
    }

    #[test]
    fn apply_tracks_interns_redirect_ids_from_same_node() {
        let session = test_session();
        let returned = Identifier([0x22; 16]);
        let redirect = Identifier([0x33; 16]);
        let fragment = format!(
            "<track><id>{}</id><redirect><id>{}</id></redirect><title>Song</title><available>1</available></track>",
            wireproto::bytes_to_hex(returned.as_bytes()),
            wireproto::bytes_to_hex(redirect.as_bytes()),
        );
        let doc = splice_document("tracks", fragment.as_bytes());
        let tree = parse_xml(&doc).unwrap();
        apply_tracks(&session, &tree).unwrap();

        let a = session.intern_track(returned);
        let b = session.intern_track(redirect);
        assert!(a.is_loaded());
        assert!(b.is_loaded());
        assert_eq!(a.title(), "Song");
        assert_eq!(b.title(), "Song");
        assert_eq!(a.availability(), Availability::Available);
    }

    #[test]
    fn start_browse_with_no_ids_completes_immediately() {
        let session = test_session();
        let req_id = session
            .queue()
            .post(RequestKind::BrowseAlbum, RequestInput::BrowseAlbum { id: Identifier::ZERO });
        start_browse(&session, req_id, BrowseKind::Album, Vec::new());
        let mut timeout = None;
        let req = session.queue().fetch_next_result(&mut timeout).unwrap();
        assert!(req.error.is_none());
    }

    #[test]
    fn start_browse_sends_a_batch_and_stashes_outbound_packet() {
        let session = test_session();
        let req_id = session
            .queue()
            .post(RequestKind::BrowseArtist, RequestInput::BrowseArtist { id: Identifier::ZERO });
        start_browse(&session, req_id, BrowseKind::Artist, vec![Identifier([0x09; 16])]);
        let packets = session.drain_outbound();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0][0], wireproto::CommandCode::Browse as u8);
    }
}

//! Request type catalog (spec §4.G table) and the per-request input/output
//! carried through `wireproto::RequestQueue`.

use std::sync::Arc;
use wiregraph::Playlist;
use wireproto::Identifier;

/// The `type` column of spec §4.G's request catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    PcLoad,
    PlaylistLoad,
    PlaylistChange,
    BrowsePlaylistTracks,
    BrowseAlbum,
    BrowseArtist,
    BrowseTrack,
    PcPlaylistAdd,
    PlaylistRename,
    PlaylistStateChanged,
    Login,
    Logout,
    Notify,
    PlayTokenLost,
}

/// Input payload variants, one per request kind that needs one.
pub enum RequestInput<S> {
    PcLoad,
    PlaylistLoad { playlist: Arc<Playlist<S>> },
    PlaylistChange { playlist: Arc<Playlist<S>>, ops_xml: Vec<u8> },
    BrowsePlaylistTracks { playlist: Arc<Playlist<S>>, ids: Vec<Identifier> },
    BrowseAlbum { id: Identifier },
    BrowseArtist { id: Identifier },
    BrowseTrack { id: Identifier },
    Login { username: String, password: String },
    Logout,
}

/// Hand-written rather than `#[derive(Clone)]`: the derive would add a
/// spurious `S: Clone` bound (none of these variants actually clone an
/// `S`, only an `Arc<Playlist<S>>`, which is `Clone` regardless of `S`).
/// `RequestQueue::with_next_runnable` clones a request's input out from
/// under its lock before handing it to the dispatch closure (see
/// `wireproto::queue`), so this type has to be `Clone` to be queued at all.
impl<S> Clone for RequestInput<S> {
    fn clone(&self) -> Self {
        match self {
            RequestInput::PcLoad => RequestInput::PcLoad,
            RequestInput::PlaylistLoad { playlist } => RequestInput::PlaylistLoad { playlist: playlist.clone() },
            RequestInput::PlaylistChange { playlist, ops_xml } => RequestInput::PlaylistChange {
                playlist: playlist.clone(),
                ops_xml: ops_xml.clone(),
            },
            RequestInput::BrowsePlaylistTracks { playlist, ids } => RequestInput::BrowsePlaylistTracks {
                playlist: playlist.clone(),
                ids: ids.clone(),
            },
            RequestInput::BrowseAlbum { id } => RequestInput::BrowseAlbum { id: *id },
            RequestInput::BrowseArtist { id } => RequestInput::BrowseArtist { id: *id },
            RequestInput::BrowseTrack { id } => RequestInput::BrowseTrack { id: *id },
            RequestInput::Login { username, password } => RequestInput::Login {
                username: username.clone(),
                password: password.clone(),
            },
            RequestInput::Logout => RequestInput::Logout,
        }
    }
}

/// Output payload variants delivered to the embedding via
/// `fetch_next_result` (spec §4.D/§6 callbacks).
pub enum RequestOutput<S> {
    ContainerLoaded,
    PlaylistAdded { playlist: Arc<Playlist<S>>, position: usize },
    PlaylistRenamed { playlist: Arc<Playlist<S>> },
    PlaylistStateChanged { playlist: Arc<Playlist<S>> },
    BrowseComplete,
    LoggedIn,
    LoggedOut,
    Notify { message: String },
    PlayTokenLost,
}

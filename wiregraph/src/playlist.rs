//! Playlist entity (spec §3, §4.C) and its container.
//!
//! Mirrors `playlist.c`'s `playlist` struct: a name/description/image plus
//! an ordered track list, an owner, a revision/checksum pair used to detect
//! out-of-sync replies, and a small per-playlist state machine
//! (`Added -> Listed -> Loaded`) that gates which requests are allowed to
//! fire. The original holds a raw `sp_session *` back-pointer; here that
//! becomes a `Weak<S>` so a playlist never keeps its owning session alive.

use crate::track::Track;
use crate::user::User;
use std::sync::{Arc, RwLock, Weak};
use wireproto::Identifier17;

/// Where a playlist sits in its own load lifecycle, independent of whether
/// its individual tracks are loaded (grounded in `playlist.c`'s
/// `PLAYLIST_ADDED` / `PLAYLIST_LISTED` / `PLAYLIST_LOADED` states).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaylistState {
    #[default]
    Added,
    Listed,
    Loaded,
}

/// Inert per-playlist offline-sync status. The original's disk-cache
/// download path is out of scope here; this field exists only so the enum
/// shape survives and nothing downstream has to special-case its absence.
/// Every playlist starts and stays at `No`: nothing in this crate writes
/// any other variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OfflineStatus {
    #[default]
    No,
    Waiting,
    Downloading,
    Done,
}

pub trait PlaylistCallback<S>: Send + Sync {
    fn on_tracks_added(&self, playlist: &Playlist<S>, position: usize, count: usize);
    fn on_tracks_removed(&self, playlist: &Playlist<S>, position: usize, count: usize);
    fn on_renamed(&self, playlist: &Playlist<S>);
    fn on_state_changed(&self, playlist: &Playlist<S>);
}

pub struct Playlist<S> {
    pub id: Identifier17,
    session: Weak<S>,
    inner: RwLock<Inner<S>>,
}

struct Inner<S> {
    name: String,
    description: String,
    image_id: Option<wireproto::Identifier>,
    owner: Option<Arc<User>>,
    position: u32,
    shared: bool,
    revision: u64,
    checksum: u32,
    tracks: Vec<Arc<Track>>,
    state: PlaylistState,
    offline_status: OfflineStatus,
    callbacks: Vec<Arc<dyn PlaylistCallback<S>>>,
    /// Track ids received from a browse reply that arrived before this
    /// playlist's own track list was fully populated; applied once loading
    /// catches up (spec §4.C's "pending-payload buffer").
    pending_payload: Vec<u8>,
}

impl<S> Playlist<S> {
    pub fn new(id: Identifier17, session: Weak<S>) -> Self {
        Self {
            id,
            session,
            inner: RwLock::new(Inner {
                name: String::new(),
                description: String::new(),
                image_id: None,
                owner: None,
                position: 0,
                shared: false,
                revision: 0,
                checksum: 0,
                tracks: Vec::new(),
                state: PlaylistState::Added,
                offline_status: OfflineStatus::No,
                callbacks: Vec::new(),
                pending_payload: Vec::new(),
            }),
        }
    }

    pub fn session(&self) -> Option<Arc<S>> {
        self.session.upgrade()
    }

    pub fn name(&self) -> String {
        self.inner.read().unwrap().name.clone()
    }

    pub fn description(&self) -> String {
        self.inner.read().unwrap().description.clone()
    }

    pub fn image_id(&self) -> Option<wireproto::Identifier> {
        self.inner.read().unwrap().image_id
    }

    pub fn owner(&self) -> Option<Arc<User>> {
        self.inner.read().unwrap().owner.clone()
    }

    pub fn position(&self) -> u32 {
        self.inner.read().unwrap().position
    }

    pub fn shared(&self) -> bool {
        self.inner.read().unwrap().shared
    }

    pub fn revision(&self) -> u64 {
        self.inner.read().unwrap().revision
    }

    pub fn checksum(&self) -> u32 {
        self.inner.read().unwrap().checksum
    }

    pub fn tracks(&self) -> Vec<Arc<Track>> {
        self.inner.read().unwrap().tracks.clone()
    }

    pub fn track_count(&self) -> usize {
        self.inner.read().unwrap().tracks.len()
    }

    pub fn state(&self) -> PlaylistState {
        self.inner.read().unwrap().state
    }

    pub fn offline_status(&self) -> OfflineStatus {
        self.inner.read().unwrap().offline_status
    }

    pub fn add_callback(&self, callback: Arc<dyn PlaylistCallback<S>>) {
        self.inner.write().unwrap().callbacks.push(callback);
    }

    pub fn set_metadata(
        &self,
        name: String,
        description: String,
        image_id: Option<wireproto::Identifier>,
        owner: Option<Arc<User>>,
        position: u32,
        shared: bool,
    ) {
        let mut inner = self.inner.write().unwrap();
        inner.name = name;
        inner.description = description;
        inner.image_id = image_id;
        inner.owner = owner;
        inner.position = position;
        inner.shared = shared;
    }

    /// Replaces the track list and advances revision/checksum, the result of
    /// a successful full load or a confirmed change (spec invariant: the
    /// checksum always reflects exactly the current `tracks`).
    /// Updates this playlist's index within its container (spec invariant 2:
    /// `c.playlists[p.position] == p`). Called by `Container` whenever an
    /// insert, remove, or move shifts anyone's index.
    pub fn set_position(&self, position: u32) {
        self.inner.write().unwrap().position = position;
    }

    pub fn set_tracks(&self, tracks: Vec<Arc<Track>>, revision: u64, checksum: u32) {
        let mut inner = self.inner.write().unwrap();
        inner.tracks = tracks;
        inner.revision = revision;
        inner.checksum = checksum;
    }

    pub fn advance_state(&self, state: PlaylistState) {
        let callbacks = {
            let mut inner = self.inner.write().unwrap();
            inner.state = state;
            inner.callbacks.clone()
        };
        for cb in callbacks {
            cb.on_state_changed(self);
        }
    }

    pub fn rename(&self, name: String) {
        let callbacks = {
            let mut inner = self.inner.write().unwrap();
            inner.name = name;
            inner.callbacks.clone()
        };
        for cb in callbacks {
            cb.on_renamed(self);
        }
    }

    pub fn insert_tracks(&self, position: usize, new_tracks: Vec<Arc<Track>>) {
        let count = new_tracks.len();
        let callbacks = {
            let mut inner = self.inner.write().unwrap();
            let at = position.min(inner.tracks.len());
            for (i, t) in new_tracks.into_iter().enumerate() {
                inner.tracks.insert(at + i, t);
            }
            inner.callbacks.clone()
        };
        for cb in callbacks {
            cb.on_tracks_added(self, position, count);
        }
    }

    pub fn remove_tracks(&self, position: usize, count: usize) {
        let callbacks = {
            let mut inner = self.inner.write().unwrap();
            let end = (position + count).min(inner.tracks.len());
            if position < end {
                inner.tracks.drain(position..end);
            }
            inner.callbacks.clone()
        };
        for cb in callbacks {
            cb.on_tracks_removed(self, position, count);
        }
    }

    pub fn stash_pending_payload(&self, bytes: Vec<u8>) {
        self.inner.write().unwrap().pending_payload = bytes;
    }

    pub fn take_pending_payload(&self) -> Vec<u8> {
        std::mem::take(&mut self.inner.write().unwrap().pending_payload)
    }
}

impl<S> std::fmt::Debug for Playlist<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playlist")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("state", &self.state())
            .field("track_count", &self.track_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopSession;

    #[test]
    fn new_playlist_starts_added_with_no_tracks() {
        let p: Playlist<NoopSession> = Playlist::new(Identifier17::ZERO, Weak::new());
        assert_eq!(p.state(), PlaylistState::Added);
        assert_eq!(p.track_count(), 0);
        assert_eq!(p.offline_status(), OfflineStatus::No);
    }

    #[test]
    fn insert_and_remove_tracks_adjust_count() {
        let p: Playlist<NoopSession> = Playlist::new(Identifier17::ZERO, Weak::new());
        let t = Arc::new(Track::new(wireproto::Identifier::ZERO));
        p.insert_tracks(0, vec![t.clone(), t.clone()]);
        assert_eq!(p.track_count(), 2);
        p.remove_tracks(0, 1);
        assert_eq!(p.track_count(), 1);
    }

    #[test]
    fn set_tracks_updates_revision_and_checksum() {
        let p: Playlist<NoopSession> = Playlist::new(Identifier17::ZERO, Weak::new());
        p.set_tracks(Vec::new(), 3, 0xdead_beef);
        assert_eq!(p.revision(), 3);
        assert_eq!(p.checksum(), 0xdead_beef);
    }
}

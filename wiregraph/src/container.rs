//! Playlist container: the user's ordered playlist list (spec §3, §4.C).

use crate::playlist::Playlist;
use std::sync::{Arc, RwLock};

pub trait ContainerCallback<S>: Send + Sync {
    fn on_playlist_added(&self, container: &Container<S>, position: usize);
    fn on_playlist_removed(&self, container: &Container<S>, position: usize);
    fn on_playlist_moved(&self, container: &Container<S>, from: usize, to: usize);
    fn on_loaded(&self, container: &Container<S>);
}

pub struct Container<S> {
    inner: RwLock<Inner<S>>,
}

struct Inner<S> {
    playlists: Vec<Arc<Playlist<S>>>,
    revision: u64,
    checksum: u32,
    dirty: bool,
    loaded: bool,
    callbacks: Vec<Arc<dyn ContainerCallback<S>>>,
}

impl<S> Container<S> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                playlists: Vec::new(),
                revision: 0,
                checksum: 0,
                dirty: false,
                loaded: false,
                callbacks: Vec::new(),
            }),
        }
    }

    pub fn playlists(&self) -> Vec<Arc<Playlist<S>>> {
        self.inner.read().unwrap().playlists.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().playlists.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.inner.read().unwrap().revision
    }

    pub fn checksum(&self) -> u32 {
        self.inner.read().unwrap().checksum
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.read().unwrap().dirty
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().unwrap().loaded
    }

    pub fn add_callback(&self, callback: Arc<dyn ContainerCallback<S>>) {
        self.inner.write().unwrap().callbacks.push(callback);
    }

    /// Replaces the full playlist sequence and marks the container loaded,
    /// the terminal step of the container load flow (spec §4.H).
    pub fn set_loaded(&self, playlists: Vec<Arc<Playlist<S>>>, revision: u64, checksum: u32) {
        let (callbacks, snapshot) = {
            let mut inner = self.inner.write().unwrap();
            inner.playlists = playlists;
            inner.revision = revision;
            inner.checksum = checksum;
            inner.dirty = false;
            inner.loaded = true;
            (inner.callbacks.clone(), inner.playlists.clone())
        };
        renumber(&snapshot);
        for cb in callbacks {
            cb.on_loaded(self);
        }
    }

    pub fn insert(&self, position: usize, playlist: Arc<Playlist<S>>) {
        let (callbacks, snapshot) = {
            let mut inner = self.inner.write().unwrap();
            let at = position.min(inner.playlists.len());
            inner.playlists.insert(at, playlist);
            inner.dirty = true;
            (inner.callbacks.clone(), inner.playlists.clone())
        };
        renumber(&snapshot);
        for cb in callbacks {
            cb.on_playlist_added(self, position);
        }
    }

    pub fn remove(&self, position: usize) {
        let (callbacks, snapshot) = {
            let mut inner = self.inner.write().unwrap();
            if position < inner.playlists.len() {
                inner.playlists.remove(position);
            }
            inner.dirty = true;
            (inner.callbacks.clone(), inner.playlists.clone())
        };
        renumber(&snapshot);
        for cb in callbacks {
            cb.on_playlist_removed(self, position);
        }
    }

    pub fn move_playlist(&self, from: usize, to: usize) {
        let (callbacks, snapshot) = {
            let mut inner = self.inner.write().unwrap();
            if from < inner.playlists.len() && to <= inner.playlists.len() {
                let p = inner.playlists.remove(from);
                let at = to.min(inner.playlists.len());
                inner.playlists.insert(at, p);
            }
            inner.dirty = true;
            (inner.callbacks.clone(), inner.playlists.clone())
        };
        renumber(&snapshot);
        for cb in callbacks {
            cb.on_playlist_moved(self, from, to);
        }
    }

    pub fn mark_clean(&self, revision: u64, checksum: u32) {
        let mut inner = self.inner.write().unwrap();
        inner.revision = revision;
        inner.checksum = checksum;
        inner.dirty = false;
    }
}

/// Stamps every playlist's `position` with its current index (spec
/// invariant 2: `c.playlists[p.position] == p`). Run outside the
/// container's own lock since each call takes the playlist's own lock.
fn renumber<S>(playlists: &[Arc<Playlist<S>>]) {
    for (idx, p) in playlists.iter().enumerate() {
        p.set_position(idx as u32);
    }
}

impl<S> Default for Container<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for Container<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("len", &self.len())
            .field("revision", &self.revision())
            .field("loaded", &self.is_loaded())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::Playlist;
    use std::sync::Weak;
    use wireproto::Identifier17;

    struct NoopSession;

    #[test]
    fn new_container_is_empty_and_unloaded() {
        let c: Container<NoopSession> = Container::new();
        assert!(c.is_empty());
        assert!(!c.is_loaded());
    }

    #[test]
    fn insert_and_remove_adjust_len_and_mark_dirty() {
        let c: Container<NoopSession> = Container::new();
        let p = Arc::new(Playlist::new(Identifier17::ZERO, Weak::new()));
        c.insert(0, p);
        assert_eq!(c.len(), 1);
        assert!(c.is_dirty());
        c.remove(0);
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn set_loaded_clears_dirty_and_sets_loaded() {
        let c: Container<NoopSession> = Container::new();
        c.set_loaded(Vec::new(), 5, 0x1234);
        assert!(c.is_loaded());
        assert!(!c.is_dirty());
        assert_eq!(c.revision(), 5);
    }

    #[test]
    fn insert_remove_and_move_keep_position_synced_with_index() {
        let c: Container<NoopSession> = Container::new();
        let a = Arc::new(Playlist::new(Identifier17::ZERO, Weak::new()));
        let b = Arc::new(Playlist::new(Identifier17::ZERO, Weak::new()));
        let d = Arc::new(Playlist::new(Identifier17::ZERO, Weak::new()));
        c.insert(0, a.clone());
        c.insert(1, b.clone());
        c.insert(2, d.clone());
        assert_eq!((a.position(), b.position(), d.position()), (0, 1, 2));

        c.remove(0);
        let playlists = c.playlists();
        assert_eq!(playlists[0].position(), 0);
        assert_eq!(playlists[1].position(), 1);

        c.move_playlist(1, 0);
        let playlists = c.playlists();
        for (idx, p) in playlists.iter().enumerate() {
            assert_eq!(p.position(), idx as u32);
        }
    }
}

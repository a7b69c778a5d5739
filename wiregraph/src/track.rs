//! Track entity (spec §3).

use crate::album::Album;
use crate::artist::Artist;
use crate::entity::{Availability, LoadState};
use std::sync::{Arc, RwLock};
use wireproto::Identifier;

pub struct Track {
    pub id: Identifier,
    inner: RwLock<Inner>,
}

struct Inner {
    title: String,
    artists: Vec<Arc<Artist>>,
    album: Option<Arc<Album>>,
    duration_ms: u32,
    availability: Availability,
    load_state: LoadState,
}

impl Track {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            inner: RwLock::new(Inner {
                title: String::new(),
                artists: Vec::new(),
                album: None,
                duration_ms: 0,
                availability: Availability::Unknown,
                load_state: LoadState::NotLoaded,
            }),
        }
    }

    pub fn title(&self) -> String {
        self.inner.read().unwrap().title.clone()
    }

    /// Artists in wire order; the first is the primary artist.
    pub fn artists(&self) -> Vec<Arc<Artist>> {
        self.inner.read().unwrap().artists.clone()
    }

    pub fn album(&self) -> Option<Arc<Album>> {
        self.inner.read().unwrap().album.clone()
    }

    pub fn duration_ms(&self) -> u32 {
        self.inner.read().unwrap().duration_ms
    }

    pub fn availability(&self) -> Availability {
        self.inner.read().unwrap().availability
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().unwrap().load_state.is_loaded()
    }

    pub fn load_state(&self) -> LoadState {
        self.inner.read().unwrap().load_state
    }

    pub fn set_loading(&self) {
        self.inner.write().unwrap().load_state = LoadState::Loading;
    }

    pub fn set_error(&self) {
        self.inner.write().unwrap().load_state = LoadState::Error;
    }

    pub fn set_loaded(
        &self,
        title: String,
        artists: Vec<Arc<Artist>>,
        album: Option<Arc<Album>>,
        duration_ms: u32,
        availability: Availability,
    ) {
        let mut inner = self.inner.write().unwrap();
        inner.title = title;
        inner.artists = artists;
        inner.album = album;
        inner.duration_ms = duration_ms;
        inner.availability = availability;
        inner.load_state = LoadState::Loaded;
    }

    /// Applies a redirect reply (track replaced by another playable track),
    /// keeping this handle's identity but refreshing its content from the
    /// replacement's fields.
    pub fn set_redirected(&self, availability: Availability) {
        self.inner.write().unwrap().availability = availability;
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("title", &self.title())
            .field("availability", &self.availability())
            .field("load_state", &self.load_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_loaded_and_unknown_availability() {
        let t = Track::new(Identifier::ZERO);
        assert!(!t.is_loaded());
        assert_eq!(t.availability(), Availability::Unknown);
    }

    #[test]
    fn set_loaded_populates_fields() {
        let t = Track::new(Identifier::ZERO);
        let artist = Arc::new(Artist::new(Identifier::ZERO));
        t.set_loaded(
            "Blue in Green".into(),
            vec![artist.clone()],
            None,
            284_000,
            Availability::Available,
        );
        assert!(t.is_loaded());
        assert_eq!(t.title(), "Blue in Green");
        assert_eq!(t.artists().len(), 1);
        assert_eq!(t.availability(), Availability::Available);
    }
}

//! Album entity (spec §3).

use crate::artist::Artist;
use crate::entity::LoadState;
use std::sync::{Arc, RwLock};
use wireproto::Identifier;

pub struct Album {
    pub id: Identifier,
    inner: RwLock<Inner>,
}

struct Inner {
    name: String,
    artist: Option<Arc<Artist>>,
    year: Option<u32>,
    cover_image_id: Option<Identifier>,
    load_state: LoadState,
}

impl Album {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            inner: RwLock::new(Inner {
                name: String::new(),
                artist: None,
                year: None,
                cover_image_id: None,
                load_state: LoadState::NotLoaded,
            }),
        }
    }

    pub fn name(&self) -> String {
        self.inner.read().unwrap().name.clone()
    }

    pub fn artist(&self) -> Option<Arc<Artist>> {
        self.inner.read().unwrap().artist.clone()
    }

    pub fn year(&self) -> Option<u32> {
        self.inner.read().unwrap().year
    }

    pub fn cover_image_id(&self) -> Option<Identifier> {
        self.inner.read().unwrap().cover_image_id
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
        name: String,
        artist: Arc<Artist>,
        year: Option<u32>,
        cover_image_id: Option<Identifier>,
    ) {
        let mut inner = self.inner.write().unwrap();
        inner.name = name;
        inner.artist = Some(artist);
        inner.year = year;
        inner.cover_image_id = cover_image_id;
        inner.load_state = LoadState::Loaded;
    }
}

impl std::fmt::Debug for Album {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Album")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("load_state", &self.load_state())
            .finish()
    }
}

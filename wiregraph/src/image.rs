//! Image entity: raw cover-art bytes keyed by id (spec §3).

use crate::entity::LoadState;
use std::sync::RwLock;
use wireproto::Identifier;

pub struct Image {
    pub id: Identifier,
    inner: RwLock<Inner>,
}

struct Inner {
    data: Vec<u8>,
    load_state: LoadState,
}

impl Image {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            inner: RwLock::new(Inner {
                data: Vec::new(),
                load_state: LoadState::NotLoaded,
            }),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().unwrap().load_state.is_loaded()
    }

    pub fn data(&self) -> Vec<u8> {
        self.inner.read().unwrap().data.clone()
    }

    pub fn set_loaded(&self, data: Vec<u8>) {
        let mut inner = self.inner.write().unwrap();
        inner.data = data;
        inner.load_state = LoadState::Loaded;
    }

    pub fn set_loading(&self) {
        self.inner.write().unwrap().load_state = LoadState::Loading;
    }

    pub fn set_error(&self) {
        self.inner.write().unwrap().load_state = LoadState::Error;
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("bytes", &self.inner.read().unwrap().data.len())
            .finish()
    }
}

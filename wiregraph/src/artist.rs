//! Artist entity (spec §3).

use crate::entity::LoadState;
use std::sync::RwLock;
use wireproto::Identifier;

pub struct Artist {
    pub id: Identifier,
    inner: RwLock<Inner>,
}

struct Inner {
    name: String,
    load_state: LoadState,
}

impl Artist {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            inner: RwLock::new(Inner {
                name: String::new(),
                load_state: LoadState::NotLoaded,
            }),
        }
    }

    pub fn name(&self) -> String {
        self.inner.read().unwrap().name.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().unwrap().load_state.is_loaded()
    }

    pub fn load_state(&self) -> LoadState {
        self.inner.read().unwrap().load_state
    }

    /// Applies parsed browse data. Called only by the IO worker.
    pub fn set_loaded(&self, name: String) {
        let mut inner = self.inner.write().unwrap();
        inner.name = name;
        inner.load_state = LoadState::Loaded;
    }

    pub fn set_loading(&self) {
        self.inner.write().unwrap().load_state = LoadState::Loading;
    }

    pub fn set_error(&self) {
        self.inner.write().unwrap().load_state = LoadState::Error;
    }
}

impl std::fmt::Debug for Artist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artist")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("load_state", &self.load_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_loaded() {
        let a = Artist::new(Identifier::ZERO);
        assert_eq!(a.load_state(), LoadState::NotLoaded);
        assert!(!a.is_loaded());
    }

    #[test]
    fn set_loaded_updates_name_and_state() {
        let a = Artist::new(Identifier::ZERO);
        a.set_loading();
        assert_eq!(a.load_state(), LoadState::Loading);
        a.set_loaded("Miles Davis".into());
        assert!(a.is_loaded());
        assert_eq!(a.name(), "Miles Davis");
    }
}

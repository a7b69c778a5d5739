//! User entity (spec §3). Keyed by canonical (lowercased) account name
//! rather than a binary id, matching the original's use of the login name
//! as the playlist-owner key.

use crate::entity::LoadState;
use std::sync::RwLock;

pub struct User {
    pub canonical_name: String,
    inner: RwLock<Inner>,
}

struct Inner {
    display_name: Option<String>,
    load_state: LoadState,
}

impl User {
    pub fn new(canonical_name: String) -> Self {
        Self {
            canonical_name,
            inner: RwLock::new(Inner {
                display_name: None,
                load_state: LoadState::NotLoaded,
            }),
        }
    }

    pub fn display_name(&self) -> Option<String> {
        self.inner.read().unwrap().display_name.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().unwrap().load_state.is_loaded()
    }

    pub fn set_loaded(&self, display_name: Option<String>) {
        let mut inner = self.inner.write().unwrap();
        inner.display_name = display_name;
        inner.load_state = LoadState::Loaded;
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("canonical_name", &self.canonical_name)
            .field("display_name", &self.display_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_unloaded_with_no_display_name() {
        let u = User::new("miles".into());
        assert!(!u.is_loaded());
        assert!(u.display_name().is_none());
    }
}

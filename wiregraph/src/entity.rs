//! Shared entity scaffolding: load state, common to every interned kind.

/// Tracks whether an entity's detail has been fetched yet, beyond the bare
/// `is_loaded` bool the original exposes: distinguishes "never asked" from
/// "browse in flight" so a second reference to an entity mid-browse doesn't
/// re-issue the request (grounded in `sp_artist.c`/`sp_album.c`'s handling
/// of a second browse call while one is outstanding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Error,
}

impl LoadState {
    pub fn is_loaded(self) -> bool {
        matches!(self, LoadState::Loaded)
    }
}

/// Streaming availability of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Unknown,
    Available,
    NotPlayable,
}

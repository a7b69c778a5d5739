//! Session facade crate (spec §2 crate-split, §6 "Embedding API surface").
//!
//! `wireclient` is the outermost of the three crates: it owns the session's
//! request queue, entity tables, and channel table, and drives the request
//! catalog (spec §4.G) and browse/playlist flows (spec §4.H) on top of the
//! wire codec (`wireproto`) and entity graph (`wiregraph`) beneath it. The
//! embedding only ever touches what's re-exported here.

pub mod browse;
pub mod config;
pub mod error;
pub mod playlist_flow;
pub mod request;
pub mod session;
pub mod worker;
pub mod xml_util;

pub use config::{get_config, RetryConfig, SessionConfig};
pub use error::{Result, WireError};
pub use request::{RequestInput, RequestKind, RequestOutput};
pub use browse::browse_entity;
pub use session::{
    session_change_playlist, session_init, session_load_container, session_load_playlist, session_login,
    session_logout, session_release, Session, SessionCallback,
};
pub use worker::run_worker_cycle;

pub use wireproto::{Inbound, Transport};
pub use wiregraph::{
    Album, Artist, Availability, Container, Image, LoadState, Playlist, PlaylistState, Track, User,
};

//! Interned entity graph: artists, albums, tracks, users, playlists, images,
//! and the playlist container (spec §3, §4.B, §4.C).

pub mod album;
pub mod artist;
pub mod checksum;
pub mod container;
pub mod entity;
pub mod image;
pub mod playlist;
pub mod table;
pub mod track;
pub mod user;

pub use album::Album;
pub use artist::Artist;
pub use checksum::{container_checksum, playlist_checksum};
pub use container::{Container, ContainerCallback};
pub use entity::{Availability, LoadState};
pub use image::Image;
pub use playlist::{OfflineStatus, Playlist, PlaylistCallback, PlaylistState};
pub use table::InternTable;
pub use track::Track;
pub use user::User;

//! Low-level transport errors. Domain-facing error kinds (spec §7) are
//! assembled one layer up, in `wireclient::error`, since they need to know
//! about playlists/browses/sessions; this crate only reports what can go
//! wrong moving bytes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Framing(String),
}

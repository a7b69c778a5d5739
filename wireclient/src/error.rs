//! Error kinds surfaced to the embedding (spec §7), modeled the way
//! `pmoqobuz::error::QobuzError` models its own error catalog: one
//! `thiserror` enum, `#[from]` conversions for the collaborator errors this
//! crate actually receives, one crate-local `Result` alias.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WireError>;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("is loading")]
    IsLoading,

    #[error("bad api version")]
    BadApiVersion,

    #[error("bad user agent")]
    BadUserAgent,

    #[error("bad application key")]
    BadApplicationKey,

    #[error("api init failed: {0}")]
    ApiInitFailed(String),

    #[error("invalid indata: {0}")]
    InvalidIndata(String),

    #[error("resource not loaded")]
    ResourceNotLoaded,

    #[error("track not playable")]
    TrackNotPlayable,

    #[error("transient error: {0}")]
    OtherTransient(String),

    #[error("permanent error: {0}")]
    OtherPermanent(String),

    #[error("socket io error")]
    Io(#[from] std::io::Error),

    #[error("xml parse error")]
    Xml(#[from] quick_xml::Error),

    #[error("config error")]
    Config(#[from] anyhow::Error),
}

impl WireError {
    /// Malformed or id-mismatched XML is always permanent: the owning
    /// request completes with an error rather than retrying (spec §7).
    pub fn parse_failure(detail: impl Into<String>) -> Self {
        WireError::OtherPermanent(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_is_other_permanent() {
        let err = WireError::parse_failure("missing version node");
        assert!(matches!(err, WireError::OtherPermanent(_)));
    }
}

//! # wireproto
//!
//! The request/IO engine and channel multiplexer at the core of the client
//! (spec components A, D, E, F, G): identifiers and buffers, the cross-thread
//! request queue, the channel multiplexer, the two command encoders this
//! core needs, and the IO worker loop's cycle mechanics.
//!
//! This crate knows nothing about playlists, tracks, or browses — that
//! domain logic lives one layer up in `wiregraph` (entity storage) and
//! `wireclient` (orchestration). It only knows how to move typed requests
//! between threads and framed bytes between this process and a socket.

pub mod adler32;
pub mod buffer;
pub mod channel;
pub mod command;
pub mod error;
pub mod ident;
pub mod queue;
pub mod worker;

pub use adler32::{adler32, Adler32};
pub use buffer::GrowBuffer;
pub use channel::{ChannelCallback, ChannelState, ChannelTable, Terminal};
pub use command::{
    build_browse_payload, cmd_browse, cmd_change_playlist, cmd_get_playlist, BrowseKind, CommandCode,
    REVISION_MASK_ALL,
};
pub use error::TransportError;
pub use ident::{bytes_to_hex, hex_to_bytes, parse_id16_list, parse_id17_list, Identifier, Identifier17};
pub use queue::{now_ms, Request, RequestQueue, RequestState};
pub use worker::{run_io_cycle, Inbound, Transport, MAX_POLL_MS};

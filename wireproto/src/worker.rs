//! IO worker loop mechanics (spec §4.G).
//!
//! The IO worker is the only thread touching the socket, the channel table
//! and (by extension, one layer up) the entity graph. This module owns the
//! *shape* of one iteration — drain runnable requests, bound the socket poll
//! by the next deadline, dispatch inbound packets by whether they carry a
//! channel id — without knowing anything about playlists, browses, or
//! logins. The request-type switch and the command-code switch (spec's
//! "Request type catalog") are supplied by the caller as closures, since
//! that dispatch table is session/domain-specific (spec §4.H territory);
//! this module only guarantees the cycle runs them in the right order with
//! the right timeout budget.
//!
//! Socket-level framing/encryption is an external collaborator (spec §1,
//! §6): `Transport` is the seam. A real transport decrypts the session's
//! authenticated cipher and reassembles `{u16 channel_id, header_or_data}`
//! reply packets before handing them up as `Inbound` values.

use crate::queue::{now_ms, RequestQueue};
use std::io;
use std::time::Duration;

/// One fully assembled inbound packet, already decrypted, already sorted
/// into "does this carry a channel id" by the transport.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// A channel-bearing reply frame.
    ChannelData {
        channel_id: u16,
        payload: Vec<u8>,
        has_header: bool,
    },
    /// A channel entered the error state (dropped connection to that
    /// sub-stream, malformed frame, etc).
    ChannelError { channel_id: u16 },
    /// A non-channel command: pings, notifications, token loss.
    NonChannel { command_code: u8, payload: Vec<u8> },
}

/// Owns the socket for the session's lifetime. Read/write are synchronous
/// with a bounded poll so the worker can interleave request dispatch with
/// inbound reads (spec §4.G step 2).
pub trait Transport {
    fn send(&mut self, packet: &[u8]) -> io::Result<()>;

    /// Blocks for at most `timeout` waiting for one fully assembled inbound
    /// packet. Returns `Ok(None)` on timeout with nothing available.
    fn poll_recv(&mut self, timeout: Duration) -> io::Result<Option<Inbound>>;
}

/// Upper bound on how long a single socket poll may block, regardless of
/// how far away the next request deadline is. Keeps the worker responsive
/// to newly posted requests even when nothing is currently due.
pub const MAX_POLL_MS: i64 = 1_000;

/// Runs one iteration of the worker loop:
///
/// 1. Drains every request whose deadline has fired, calling
///    `dispatch_runnable` for each (spec: "a handler typically calls a
///    command encoder and sets `next_timeout = INT_MAX` to pin the request
///    while the reply is in flight").
/// 2. Polls the transport for one inbound packet, bounded by the earliest
///    remaining deadline (or `MAX_POLL_MS`, whichever is smaller).
/// 3. If a packet arrived, dispatches it: channel-bearing frames/errors go
///    to `on_channel_data`/`on_channel_error`; everything else goes to
///    `handle_non_channel`.
///
/// Returns `true` if a packet was processed, so callers can choose to loop
/// immediately instead of re-entering the poll wait.
pub fn run_io_cycle<K, I, O, E>(
    queue: &RequestQueue<K, I, O, E>,
    transport: &mut dyn Transport,
    mut dispatch_runnable: impl FnMut(u64, K, Option<I>),
    mut on_channel_data: impl FnMut(u16, &[u8], bool),
    mut on_channel_error: impl FnMut(u16),
    mut handle_non_channel: impl FnMut(u8, &[u8]),
) -> io::Result<bool>
where
    K: Copy,
    I: Clone,
{
    let now = now_ms();
    while queue
        .with_next_runnable(now, |id, kind, input| dispatch_runnable(id, kind, input))
        .is_some()
    {}

    let budget = next_poll_budget(queue, now);
    match transport.poll_recv(budget)? {
        None => Ok(false),
        Some(Inbound::ChannelData {
            channel_id,
            payload,
            has_header,
        }) => {
            on_channel_data(channel_id, &payload, has_header);
            Ok(true)
        }
        Some(Inbound::ChannelError { channel_id }) => {
            on_channel_error(channel_id);
            Ok(true)
        }
        Some(Inbound::NonChannel { command_code, payload }) => {
            handle_non_channel(command_code, &payload);
            Ok(true)
        }
    }
}

/// Computes how long the next socket poll may block: the smaller of
/// `MAX_POLL_MS` and the time until the queue's earliest pending deadline.
fn next_poll_budget<K, I, O, E>(queue: &RequestQueue<K, I, O, E>, now: i64) -> Duration
where
    K: Copy,
{
    // fetch_next_result also happens to report the minimum pending deadline,
    // but it also pops a Returned request off the queue, which would be
    // observable by the embedding thread prematurely popping work the IO
    // worker hasn't actually produced yet here — so we peek instead.
    let _ = now;
    let deadline = queue.peek_min_deadline();
    let ms = match deadline {
        Some(d) => (d - now_ms()).max(0).min(MAX_POLL_MS),
        None => MAX_POLL_MS,
    };
    Duration::from_millis(ms as u64)
}

//! Channel multiplexer (spec §4.E).
//!
//! Assigns 16-bit ids to outbound sub-requests and routes inbound framed
//! payloads to each request's streaming callback. Per the design note on
//! "dynamic dispatch via function pointers", callbacks are modeled as an
//! explicit two-method capability interface (`ChannelCallback`) rather than
//! a raw function pointer plus an untyped context blob: the callback owns
//! its own state directly instead of smuggling it through a `*mut c_void`.

use std::collections::HashMap;
use tracing::warn;

/// State of a single channel (spec §3 invariant 3: `HEADER -> DATA* ->
/// (END | ERROR)`, exactly one terminal event).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Header,
    Data,
    End,
    Error,
}

/// Terminal outcome delivered exactly once to every channel callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    End,
    Error,
}

/// The callback contract for one channel's lifetime: zero or more
/// `on_chunk` calls carrying `DATA` payload, followed by exactly one
/// `on_terminal` call. Implementors own whatever per-request context they
/// need and must treat `on_terminal` as their last chance to act.
pub trait ChannelCallback: Send {
    fn on_chunk(&mut self, payload: &[u8]);
    fn on_terminal(&mut self, outcome: Terminal);
}

struct Channel {
    name: String,
    state: ChannelState,
    callback: Box<dyn ChannelCallback>,
}

/// Per-session channel table: a monotonically increasing id counter plus a
/// map from channel id to `Channel`.
pub struct ChannelTable {
    next_id: u16,
    channels: HashMap<u16, Channel>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            channels: HashMap::new(),
        }
    }

    /// Allocates an id and inserts a channel in state `Header`. `name` is
    /// diagnostic only.
    pub fn register(&mut self, name: impl Into<String>, callback: Box<dyn ChannelCallback>) -> u16 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == 0 {
            self.next_id = 1;
        }
        self.channels.insert(
            id,
            Channel {
                name: name.into(),
                state: ChannelState::Header,
                callback,
            },
        );
        id
    }

    /// Routes an inbound payload to the channel's callback. An empty
    /// payload while in `Data` signals end-of-stream.
    ///
    /// `has_header` indicates the frame carried header fields (protocol
    /// detail out of this crate's scope); when true and the channel is
    /// still in `Header`, it advances to `Data` and forwards any residual
    /// payload bytes that followed the header.
    pub fn on_frame(&mut self, id: u16, payload: &[u8], has_header: bool) {
        let Some(ch) = self.channels.get_mut(&id) else {
            warn!("on_frame: unknown channel {id}, dropping late frame");
            return;
        };

        if ch.state == ChannelState::Header {
            if has_header {
                ch.state = ChannelState::Data;
                if !payload.is_empty() {
                    ch.callback.on_chunk(payload);
                }
                return;
            }
        }

        if payload.is_empty() {
            ch.state = ChannelState::End;
            ch.callback.on_terminal(Terminal::End);
            self.channels.remove(&id);
            return;
        }

        ch.state = ChannelState::Data;
        ch.callback.on_chunk(payload);
    }

    /// Marks a channel as failed: sets `Error`, invokes the callback once,
    /// unregisters it.
    pub fn on_error(&mut self, id: u16) {
        if let Some(mut ch) = self.channels.remove(&id) {
            ch.state = ChannelState::Error;
            ch.callback.on_terminal(Terminal::Error);
        } else {
            warn!("on_error: unknown channel {id}, dropping");
        }
    }

    /// Invoked on session teardown: every still-registered channel's
    /// callback sees `Error` exactly once, then the table is cleared.
    pub fn fail_and_unregister_all(&mut self) {
        for (_, mut ch) in self.channels.drain() {
            ch.state = ChannelState::Error;
            ch.callback.on_terminal(Terminal::Error);
        }
    }

    pub fn state_of(&self, id: u16) -> Option<ChannelState> {
        self.channels.get(&id).map(|c| c.state)
    }

    pub fn name_of(&self, id: u16) -> Option<&str> {
        self.channels.get(&id).map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        chunks: Vec<Vec<u8>>,
        terminal: Option<Terminal>,
    }

    struct RecordingCallback(Arc<Mutex<Recorder>>);

    impl ChannelCallback for RecordingCallback {
        fn on_chunk(&mut self, payload: &[u8]) {
            self.0.lock().unwrap().chunks.push(payload.to_vec());
        }
        fn on_terminal(&mut self, outcome: Terminal) {
            self.0.lock().unwrap().terminal = Some(outcome);
        }
    }

    #[test]
    fn lifecycle_is_header_data_star_end() {
        let rec = Arc::new(Mutex::new(Recorder::default()));
        let mut table = ChannelTable::new();
        let id = table.register("test", Box::new(RecordingCallback(rec.clone())));

        table.on_frame(id, b"hdr-payload", true);
        table.on_frame(id, b"chunk1", false);
        table.on_frame(id, b"chunk2", false);
        table.on_frame(id, b"", false); // END

        let r = rec.lock().unwrap();
        assert_eq!(r.chunks, vec![b"hdr-payload".to_vec(), b"chunk1".to_vec(), b"chunk2".to_vec()]);
        assert_eq!(r.terminal, Some(Terminal::End));
        assert!(table.state_of(id).is_none()); // unregistered
    }

    #[test]
    fn error_invokes_callback_once_and_unregisters() {
        let rec = Arc::new(Mutex::new(Recorder::default()));
        let mut table = ChannelTable::new();
        let id = table.register("test", Box::new(RecordingCallback(rec.clone())));
        table.on_error(id);
        assert_eq!(rec.lock().unwrap().terminal, Some(Terminal::Error));
        assert!(table.state_of(id).is_none());
    }

    #[test]
    fn late_frame_on_unknown_channel_is_dropped_silently() {
        let mut table = ChannelTable::new();
        // No panic, no effect.
        table.on_frame(9999, b"whatever", false);
        table.on_error(9999);
    }

    #[test]
    fn fail_and_unregister_all_hits_every_channel_exactly_once() {
        let rec1 = Arc::new(Mutex::new(Recorder::default()));
        let rec2 = Arc::new(Mutex::new(Recorder::default()));
        let rec3 = Arc::new(Mutex::new(Recorder::default()));
        let mut table = ChannelTable::new();
        table.register("a", Box::new(RecordingCallback(rec1.clone())));
        table.register("b", Box::new(RecordingCallback(rec2.clone())));
        table.register("c", Box::new(RecordingCallback(rec3.clone())));

        table.fail_and_unregister_all();

        for rec in [&rec1, &rec2, &rec3] {
            assert_eq!(rec.lock().unwrap().terminal, Some(Terminal::Error));
        }
        assert!(table.is_empty());
    }
}

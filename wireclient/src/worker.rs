//! IO worker wiring (spec §4.G "IO worker loop"): binds session state to
//! `wireproto::run_io_cycle`'s generic cycle mechanics.
//!
//! The embedding's dedicated IO thread is expected to call
//! `run_worker_cycle` in a tight loop for the session's lifetime (spec §6).
//! This module supplies the request-kind switch and the channel-routing
//! closures that `run_io_cycle` itself stays ignorant of.

use crate::browse;
use crate::error::WireError;
use crate::playlist_flow;
use crate::request::{RequestInput, RequestKind, RequestOutput};
use crate::session::Session;
use std::io;
use std::sync::Arc;
use wireproto::{BrowseKind, Transport};

/// Runs one IO cycle: dispatches every request whose deadline has fired,
/// then services at most one inbound packet. Outbound packets stashed by
/// request handlers during dispatch (`Session::stash_outbound`) are sent
/// only after the cycle returns, once `run_io_cycle`'s own transport borrow
/// has ended (spec §4.G step 2 shape, generalized to this core's handlers).
pub fn run_worker_cycle(session: &Arc<Session>, transport: &mut dyn Transport) -> io::Result<bool> {
    let processed = wireproto::run_io_cycle(
        session.queue(),
        transport,
        |id, kind, input| dispatch_runnable(session, id, kind, input),
        |channel_id, payload, has_header| {
            session.channels().lock().unwrap().on_frame(channel_id, payload, has_header);
        },
        |channel_id| {
            session.channels().lock().unwrap().on_error(channel_id);
        },
        |_command_code, _payload| {
            // No non-channel command (ping, notify, play-token-loss) has a
            // wire layout in scope for this core (spec §4.F names only the
            // playlist/browse encoders); nothing to route here yet.
        },
    )?;
    for packet in session.drain_outbound() {
        transport.send(&packet)?;
    }
    Ok(processed)
}

/// The request-type switch (spec §4.G catalog): for each runnable request,
/// either starts its wire exchange or, if a browse continuation is already
/// registered for this id, resumes it instead of restarting from scratch.
fn dispatch_runnable(session: &Arc<Session>, id: u64, kind: RequestKind, input: Option<RequestInput<Session>>) {
    match kind {
        RequestKind::PcLoad => playlist_flow::start_container_load(session, id),
        RequestKind::PlaylistLoad => {
            if let Some(RequestInput::PlaylistLoad { playlist }) = input {
                playlist_flow::start_playlist_load(session, id, playlist);
            }
        }
        RequestKind::PlaylistChange => {
            if let Some(RequestInput::PlaylistChange { playlist, ops_xml }) = input {
                playlist_flow::start_playlist_change(session, id, playlist, ops_xml);
            }
        }
        RequestKind::BrowsePlaylistTracks => {
            if session.lookup_browse(id).is_some() {
                browse::resume_browse(session, id);
            } else if let Some(RequestInput::BrowsePlaylistTracks { playlist, ids }) = input {
                browse::start_browse_for_playlist(session, id, BrowseKind::Track, ids, Some(playlist));
            }
        }
        RequestKind::BrowseAlbum => dispatch_browse_entity(session, id, input, BrowseKind::Album),
        RequestKind::BrowseArtist => dispatch_browse_entity(session, id, input, BrowseKind::Artist),
        RequestKind::BrowseTrack => dispatch_browse_entity(session, id, input, BrowseKind::Track),
        RequestKind::Login => {
            // The authenticated key-exchange handshake is an out-of-scope
            // collaborator (spec §1 supplement on `sp_session.c`); this
            // core always reports success so embedding callbacks have
            // something to react to.
            session.queue().set_result(id, None::<WireError>, Some(RequestOutput::LoggedIn));
        }
        RequestKind::Logout => {
            session.queue().set_result(id, None::<WireError>, Some(RequestOutput::LoggedOut));
        }
        RequestKind::PcPlaylistAdd
        | RequestKind::PlaylistRename
        | RequestKind::PlaylistStateChanged
        | RequestKind::Notify
        | RequestKind::PlayTokenLost => {
            // Always posted already-`Returned` via `post_result` (spec:
            // "shortcut for notifications that have no outbound step"), so
            // these never appear here as runnable.
        }
    }
}

fn dispatch_browse_entity(session: &Arc<Session>, id: u64, input: Option<RequestInput<Session>>, kind: BrowseKind) {
    if session.lookup_browse(id).is_some() {
        browse::resume_browse(session, id);
        return;
    }
    let entity_id = match input {
        Some(RequestInput::BrowseAlbum { id }) => Some(id),
        Some(RequestInput::BrowseArtist { id }) => Some(id),
        Some(RequestInput::BrowseTrack { id }) => Some(id),
        _ => None,
    };
    if let Some(entity_id) = entity_id {
        browse::start_browse(session, id, kind, vec![entity_id]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::session_init;
    use std::collections::VecDeque;
    use std::time::Duration;
    use wireproto::{CommandCode, Inbound};

    fn test_session() -> Arc<Session> {
        session_init(serde_yaml::from_str(include_str!("default_config.yaml")).unwrap())
    }

    struct FakeTransport {
        inbound: VecDeque<Inbound>,
        sent: Vec<Vec<u8>>,
    }

    impl Transport for FakeTransport {
        fn send(&mut self, packet: &[u8]) -> io::Result<()> {
            self.sent.push(packet.to_vec());
            Ok(())
        }
        fn poll_recv(&mut self, _timeout: Duration) -> io::Result<Option<Inbound>> {
            Ok(self.inbound.pop_front())
        }
    }

    #[test]
    fn container_load_request_sends_get_playlist_packet() {
        let session = test_session();
        crate::session::session_load_container(&session);
        let mut transport = FakeTransport {
            inbound: VecDeque::new(),
            sent: Vec::new(),
        };
        run_worker_cycle(&session, &mut transport).unwrap();
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.sent[0][0], CommandCode::GetPlaylist as u8);
    }

    #[test]
    fn login_request_completes_immediately() {
        let session = test_session();
        crate::session::session_login(&session, "alice", "hunter2");
        let mut transport = FakeTransport {
            inbound: VecDeque::new(),
            sent: Vec::new(),
        };
        run_worker_cycle(&session, &mut transport).unwrap();
        let mut timeout = None;
        let req = session.queue().fetch_next_result(&mut timeout).unwrap();
        assert!(matches!(req.output, Some(RequestOutput::LoggedIn)));
        assert!(session.is_logged_in());
    }

    #[test]
    fn browse_entity_request_sends_browse_packet() {
        let session = test_session();
        let id = wireproto::Identifier([0x7; 16]);
        browse::browse_entity(&session, RequestKind::BrowseAlbum, id);
        let mut transport = FakeTransport {
            inbound: VecDeque::new(),
            sent: Vec::new(),
        };
        run_worker_cycle(&session, &mut transport).unwrap();
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.sent[0][0], CommandCode::Browse as u8);
    }
}

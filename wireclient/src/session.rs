//! The session facade (spec §6 "Embedding API surface", spec §5).
//!
//! Owns the request queue, the channel table, and the entity graph — the
//! three things spec §4.G says only the IO worker may touch directly. The
//! embedding thread only ever calls the four primitives named in spec §6:
//! `session_init`, `session_release`, `session_login`/`session_logout`, and
//! `process_events`.

use crate::browse::BrowseState;
use crate::config::SessionConfig;
use crate::error::{Result, WireError};
use crate::request::{RequestInput, RequestKind, RequestOutput};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use wireproto::{ChannelTable, RequestQueue};
use wiregraph::{Album, Artist, Container, Image, InternTable, Playlist, Track, User};

/// Session-scoped callbacks (spec §6: "Session: `logged_in`, `logged_out`,
/// `metadata_updated`, `message_to_user`, `play_token_lost`").
pub trait SessionCallback: Send + Sync {
    fn logged_in(&self, result: std::result::Result<(), String>);
    fn logged_out(&self);
    fn metadata_updated(&self);
    fn message_to_user(&self, message: &str);
    fn play_token_lost(&self);
}

pub(crate) type SessionQueue =
    RequestQueue<RequestKind, RequestInput<Session>, RequestOutput<Session>, WireError>;

/// A session's entity tables, the channel multiplexer, and the request
/// queue (spec §3, §5). One instance per connection; created by
/// `session_init`, torn down by `session_release`.
pub struct Session {
    pub(crate) config: Arc<SessionConfig>,
    pub(crate) queue: SessionQueue,
    pub(crate) channels: Mutex<ChannelTable>,
    pub(crate) tracks: Mutex<InternTable<wireproto::Identifier, Track>>,
    pub(crate) albums: Mutex<InternTable<wireproto::Identifier, Album>>,
    pub(crate) artists: Mutex<InternTable<wireproto::Identifier, Artist>>,
    pub(crate) images: Mutex<InternTable<wireproto::Identifier, Image>>,
    pub(crate) users: Mutex<InternTable<String, User>>,
    pub container: Container<Session>,
    callbacks: Mutex<Vec<Arc<dyn SessionCallback>>>,
    logged_in: AtomicBool,
    self_weak: Weak<Session>,
    /// Packets built by request-driven logic (browse, playlist load/change)
    /// waiting for the IO worker to hand them to the transport. Buffered
    /// here rather than sent inline because building a packet happens from
    /// inside a channel callback, which runs nested under
    /// `wireproto::run_io_cycle`'s own `&mut dyn Transport` borrow; the
    /// worker drains this after `run_io_cycle` returns, once that borrow
    /// has ended.
    pending_outbound: Mutex<Vec<Vec<u8>>>,
    /// Live browse continuations, keyed by owning request id, so a
    /// transient-error retry (spec §4.D) can resume the same batch instead
    /// of restarting the whole browse from scratch.
    browse_retries: Mutex<HashMap<u64, Arc<Mutex<BrowseState>>>>,
}

impl Session {
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub fn add_callback(&self, callback: Arc<dyn SessionCallback>) {
        self.callbacks.lock().unwrap().push(callback);
    }

    pub(crate) fn weak(&self) -> Weak<Session> {
        self.self_weak.clone()
    }

    pub(crate) fn queue(&self) -> &SessionQueue {
        &self.queue
    }

    pub(crate) fn channels(&self) -> &Mutex<ChannelTable> {
        &self.channels
    }

    /// Queues a built packet for the IO worker to send once the current
    /// `run_io_cycle` transport borrow has ended.
    pub(crate) fn stash_outbound(&self, packet: Vec<u8>) {
        self.pending_outbound.lock().unwrap().push(packet);
    }

    /// Drains every packet queued by `stash_outbound` since the last drain.
    pub(crate) fn drain_outbound(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending_outbound.lock().unwrap())
    }

    pub(crate) fn register_browse(&self, req_id: u64, state: Arc<Mutex<BrowseState>>) {
        self.browse_retries.lock().unwrap().insert(req_id, state);
    }

    pub(crate) fn lookup_browse(&self, req_id: u64) -> Option<Arc<Mutex<BrowseState>>> {
        self.browse_retries.lock().unwrap().get(&req_id).cloned()
    }

    pub(crate) fn unregister_browse(&self, req_id: u64) {
        self.browse_retries.lock().unwrap().remove(&req_id);
    }

    /// Interns a track by id, matching `track_add`'s "create on first
    /// reference, share thereafter" rule (spec invariant 1).
    pub fn intern_track(&self, id: wireproto::Identifier) -> Arc<Track> {
        self.tracks.lock().unwrap().intern_with(id, || Track::new(id))
    }

    pub fn intern_album(&self, id: wireproto::Identifier) -> Arc<Album> {
        self.albums.lock().unwrap().intern_with(id, || Album::new(id))
    }

    pub fn intern_artist(&self, id: wireproto::Identifier) -> Arc<Artist> {
        self.artists.lock().unwrap().intern_with(id, || Artist::new(id))
    }

    pub fn intern_image(&self, id: wireproto::Identifier) -> Arc<Image> {
        self.images.lock().unwrap().intern_with(id, || Image::new(id))
    }

    pub fn intern_user(&self, canonical_name: &str) -> Arc<User> {
        self.users
            .lock()
            .unwrap()
            .intern_with(canonical_name.to_string(), || User::new(canonical_name.to_string()))
    }

    /// Reclaims dead entries from every interning table (spec: "periodic
    /// garbage collection may additionally drop zero-count entries").
    pub fn gc(&self) {
        self.tracks.lock().unwrap().gc();
        self.albums.lock().unwrap().gc();
        self.artists.lock().unwrap().gc();
        self.images.lock().unwrap().gc();
        self.users.lock().unwrap().gc();
    }

    fn fire_session_output(&self, output: RequestOutput<Session>) {
        let callbacks = self.callbacks.lock().unwrap().clone();
        match output {
            RequestOutput::LoggedIn => {
                self.logged_in.store(true, Ordering::SeqCst);
                for cb in &callbacks {
                    cb.logged_in(Ok(()));
                }
            }
            RequestOutput::LoggedOut => {
                self.logged_in.store(false, Ordering::SeqCst);
                for cb in &callbacks {
                    cb.logged_out();
                }
            }
            RequestOutput::Notify { message } => {
                for cb in &callbacks {
                    cb.message_to_user(&message);
                }
            }
            RequestOutput::PlayTokenLost => {
                for cb in &callbacks {
                    cb.play_token_lost();
                }
            }
            RequestOutput::ContainerLoaded
            | RequestOutput::PlaylistAdded { .. }
            | RequestOutput::PlaylistRenamed { .. }
            | RequestOutput::PlaylistStateChanged { .. }
            | RequestOutput::BrowseComplete => {
                for cb in &callbacks {
                    cb.metadata_updated();
                }
            }
        }
    }

    /// Drains every `RETURNED` request, firing session-scoped callbacks on
    /// the calling (embedding) thread, and reports how long the caller may
    /// next block (spec §6 `process_events`).
    pub fn process_events(&self, next_timeout_ms: &mut Option<i64>) {
        loop {
            let mut local_timeout = None;
            match self.queue.fetch_next_result(&mut local_timeout) {
                Some(req) => {
                    if let Some(output) = req.output {
                        self.fire_session_output(output);
                    }
                    if let Some(err) = req.error {
                        tracing::warn!(kind = ?req.kind, error = %err, "request completed with error");
                    }
                }
                None => {
                    *next_timeout_ms = local_timeout;
                    break;
                }
            }
        }
    }
}

/// Creates a session, its entity tables, and its (initially empty)
/// playlist container (spec §5 lifecycle: "created in session init,
/// destroyed in session release").
pub fn session_init(config: SessionConfig) -> Arc<Session> {
    Arc::new_cyclic(|weak| Session {
        config: Arc::new(config),
        queue: RequestQueue::new(),
        channels: Mutex::new(ChannelTable::new()),
        tracks: Mutex::new(InternTable::new()),
        albums: Mutex::new(InternTable::new()),
        artists: Mutex::new(InternTable::new()),
        images: Mutex::new(InternTable::new()),
        users: Mutex::new(InternTable::new()),
        container: Container::new(),
        callbacks: Mutex::new(Vec::new()),
        logged_in: AtomicBool::new(false),
        self_weak: weak.clone(),
        pending_outbound: Mutex::new(Vec::new()),
        browse_retries: Mutex::new(HashMap::new()),
    })
}

/// Tears a session down (spec §5 cancellation): fails every in-flight
/// channel so its callback's captured `Arc<Session>` is dropped (breaking
/// the channel-callback/session reference cycle), then posts the
/// `PC_LOAD`-independent container load's result is moot — the caller is
/// expected to drop its own `Arc<Session>` afterward.
pub fn session_release(session: &Arc<Session>) {
    session.channels.lock().unwrap().fail_and_unregister_all();
}

pub fn session_login(session: &Arc<Session>, username: impl Into<String>, password: impl Into<String>) {
    session.queue.post(
        RequestKind::Login,
        RequestInput::Login {
            username: username.into(),
            password: password.into(),
        },
    );
}

pub fn session_logout(session: &Arc<Session>) {
    session.queue.post(RequestKind::Logout, RequestInput::Logout);
}

/// Posts the container-load request (spec §4.H "Container load" step 0).
pub fn session_load_container(session: &Arc<Session>) -> u64 {
    session.queue.post(RequestKind::PcLoad, RequestInput::PcLoad)
}

/// Posts a `PLAYLIST_LOAD` request for a playlist already known to the
/// container (spec §4.H "Playlist load" step 0: triggered once the
/// container reply adds the playlist, or again on demand by the embedding).
pub fn session_load_playlist(session: &Arc<Session>, playlist: Arc<Playlist<Session>>) -> u64 {
    session
        .queue
        .post(RequestKind::PlaylistLoad, RequestInput::PlaylistLoad { playlist })
}

/// Posts a `PLAYLIST_CHANGE` request carrying the `<ops>` fragment the
/// embedding built for this edit (spec §4.H "Playlist change").
pub fn session_change_playlist(session: &Arc<Session>, playlist: Arc<Playlist<Session>>, ops_xml: Vec<u8>) -> u64 {
    session.queue.post(
        RequestKind::PlaylistChange,
        RequestInput::PlaylistChange { playlist, ops_xml },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SessionConfig {
        serde_yaml::from_str(include_str!("default_config.yaml")).unwrap()
    }

    #[test]
    fn init_creates_empty_container_and_logged_out_session() {
        let session = session_init(test_config());
        assert!(session.container.is_empty());
        assert!(!session.is_logged_in());
    }

    #[test]
    fn interning_returns_shared_handle() {
        let session = session_init(test_config());
        let id = wireproto::Identifier::ZERO;
        let a = session.intern_track(id);
        let b = session.intern_track(id);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn release_fails_open_channels() {
        let session = session_init(test_config());
        struct Noop;
        impl wireproto::ChannelCallback for Noop {
            fn on_chunk(&mut self, _payload: &[u8]) {}
            fn on_terminal(&mut self, outcome: wireproto::Terminal) {
                assert_eq!(outcome, wireproto::Terminal::Error);
            }
        }
        session.channels.lock().unwrap().register("test", Box::new(Noop));
        session_release(&session);
        assert!(session.channels.lock().unwrap().is_empty());
    }
}

//! Cross-thread request queue (spec §4.D).
//!
//! A single FIFO per session, guarded by one mutex and one condition
//! variable, carrying typed requests between the embedding thread and the
//! IO worker. Generic over the request kind `K`, the input `I`, the output
//! `O` and the error type `E` so the same mechanics serve every request type
//! in the catalog (spec §4.G) without the queue itself knowing about
//! playlists, browses, or logins.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Lifecycle state of a request (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    New,
    Running,
    Returned,
    Processed,
}

/// A single request in flight.
pub struct Request<K, I, O, E> {
    pub id: u64,
    pub kind: K,
    pub state: RequestState,
    pub input: Option<I>,
    pub output: Option<O>,
    pub error: Option<E>,
    /// Absolute millisecond deadline; `i64::MAX` pins a request while its
    /// reply is in flight (spec §4.G step 1).
    pub next_timeout_ms: i64,
}

impl<K, I, O, E> Request<K, I, O, E> {
    fn new(id: u64, kind: K, input: Option<I>, next_timeout_ms: i64) -> Self {
        Self {
            id,
            kind,
            state: RequestState::New,
            input,
            output: None,
            error: None,
            next_timeout_ms,
        }
    }
}

/// Current wall-clock time as milliseconds, the unit `next_timeout_ms` is
/// expressed in.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as i64
}

struct Inner<K, I, O, E> {
    requests: VecDeque<Request<K, I, O, E>>,
    next_id: u64,
}

/// The request queue itself: one mutex, one condvar, shared between the
/// embedding thread and the IO worker via `Arc`.
pub struct RequestQueue<K, I, O, E> {
    inner: Mutex<Inner<K, I, O, E>>,
    cv: Condvar,
}

impl<K: Copy, I, O, E> RequestQueue<K, I, O, E> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                requests: VecDeque::new(),
                next_id: 1,
            }),
            cv: Condvar::new(),
        }
    }

    /// Appends a new request in state `New`, with `next_timeout = now`, and
    /// wakes the IO worker. Input ownership transfers to the queue.
    pub fn post(&self, kind: K, input: I) -> u64 {
        let mut guard = self.inner.lock().unwrap();
        let id = guard.next_id;
        guard.next_id += 1;
        let req = Request::new(id, kind, Some(input), now_ms());
        guard.requests.push_back(req);
        self.cv.notify_all();
        id
    }

    /// Shortcut for notifications that have no outbound step: creates an
    /// already-completed request (spec: `PC_PLAYLIST_ADD`, `PLAYLIST_RENAME`).
    pub fn post_result(&self, kind: K, error: Option<E>, output: Option<O>) -> u64 {
        let mut guard = self.inner.lock().unwrap();
        let id = guard.next_id;
        guard.next_id += 1;
        let mut req = Request::new(id, kind, None, now_ms());
        req.state = RequestState::Returned;
        req.error = error;
        req.output = output;
        guard.requests.push_back(req);
        self.cv.notify_all();
        id
    }

    /// Used by the IO worker: promotes the first request whose state is
    /// `New`/`Running` and whose deadline has fired to `Running`, then hands
    /// `f` a snapshot of its id/kind/input and returns `f`'s result.
    ///
    /// `f` is called *after* the queue's internal lock is released, not
    /// while holding it: every handler this core's `dispatch_runnable`
    /// drives turns around and calls other `RequestQueue` methods (posting
    /// a result, rescheduling a deadline) against this same queue, and
    /// `std::sync::Mutex` isn't reentrant — calling `f` under the lock would
    /// deadlock the first time a handler did that.
    pub fn with_next_runnable<R>(&self, now: i64, f: impl FnOnce(u64, K, Option<I>) -> R) -> Option<R>
    where
        I: Clone,
    {
        let (id, kind, input) = {
            let mut guard = self.inner.lock().unwrap();
            let req = guard.requests.iter_mut().find(|r| {
                matches!(r.state, RequestState::New | RequestState::Running) && r.next_timeout_ms <= now
            })?;
            if req.state == RequestState::New {
                req.state = RequestState::Running;
            }
            (req.id, req.kind, req.input.clone())
        };
        Some(f(id, kind, input))
    }

    /// Looks up a running request by id to mutate its deadline/state from a
    /// channel callback (e.g. rescheduling after a transport error).
    pub fn with_request<R>(&self, id: u64, f: impl FnOnce(&mut Request<K, I, O, E>) -> R) -> Option<R> {
        let mut guard = self.inner.lock().unwrap();
        let req = guard.requests.iter_mut().find(|r| r.id == id)?;
        Some(f(req))
    }

    /// Called by the IO worker on completion: moves to `Returned`, wakes the
    /// embedding thread.
    pub fn set_result(&self, id: u64, error: Option<E>, output: Option<O>) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(req) = guard.requests.iter_mut().find(|r| r.id == id) {
            req.error = error;
            req.output = output;
            req.state = RequestState::Returned;
        }
        self.cv.notify_all();
    }

    /// Used by the embedding: returns the next `Returned` request. If none,
    /// computes the minimum `next_timeout` across the queue into
    /// `next_timeout_out` so the caller can block for that long.
    pub fn fetch_next_result(&self, next_timeout_out: &mut Option<i64>) -> Option<Request<K, I, O, E>> {
        let mut guard = self.inner.lock().unwrap();
        if let Some(pos) = guard.requests.iter().position(|r| r.state == RequestState::Returned) {
            let req = guard.requests.remove(pos).unwrap();
            *next_timeout_out = None;
            return Some(req);
        }
        *next_timeout_out = guard
            .requests
            .iter()
            .filter(|r| matches!(r.state, RequestState::New | RequestState::Running))
            .map(|r| r.next_timeout_ms)
            .min();
        None
    }

    /// Transitions `Returned` -> `Processed`. The queue reclaims the slot
    /// lazily (on the next `retain_processed` sweep) rather than eagerly, so
    /// `mark_processed` itself never has to reshuffle the deque.
    pub fn mark_processed(&self, id: u64) -> bool {
        let mut guard = self.inner.lock().unwrap();
        match guard.requests.iter_mut().find(|r| r.id == id) {
            Some(req) if req.state == RequestState::Returned => {
                req.state = RequestState::Processed;
                true
            }
            _ => false,
        }
    }

    /// Drops all `Processed` requests, reclaiming their slots.
    pub fn retain_processed(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.requests.retain(|r| r.state != RequestState::Processed);
    }

    /// Peeks the minimum `next_timeout_ms` across all pending requests
    /// without popping anything, so the IO worker can size its socket poll
    /// without racing the embedding thread's `fetch_next_result`.
    pub fn peek_min_deadline(&self) -> Option<i64> {
        let guard = self.inner.lock().unwrap();
        guard
            .requests
            .iter()
            .filter(|r| matches!(r.state, RequestState::New | RequestState::Running))
            .map(|r| r.next_timeout_ms)
            .min()
    }

    /// Blocks the IO worker until a request becomes runnable or `timeout`
    /// elapses, whichever comes first.
    pub fn wait_for_work(&self, timeout: Duration) {
        let guard = self.inner.lock().unwrap();
        let _ = self.cv.wait_timeout(guard, timeout).unwrap();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Copy, I, O, E> Default for RequestQueue<K, I, O, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Kind {
        Ping,
    }

    #[test]
    fn post_creates_new_request_runnable_immediately() {
        let q: RequestQueue<Kind, u32, u32, String> = RequestQueue::new();
        let id = q.post(Kind::Ping, 7);
        let now = now_ms();
        let seen = q.with_next_runnable(now, |_id, _kind, input| input);
        assert_eq!(seen, Some(Some(7)));
        // promoted to Running
        q.with_request(id, |r| assert_eq!(r.state, RequestState::Running));
    }

    #[test]
    fn not_runnable_before_deadline() {
        let q: RequestQueue<Kind, u32, u32, String> = RequestQueue::new();
        let id = q.post(Kind::Ping, 1);
        q.with_request(id, |r| r.next_timeout_ms = now_ms() + 10_000);
        assert!(q.with_next_runnable(now_ms(), |_, _, _| ()).is_none());
    }

    #[test]
    fn set_result_then_fetch_by_embedding() {
        let q: RequestQueue<Kind, u32, u32, String> = RequestQueue::new();
        let id = q.post(Kind::Ping, 1);
        q.set_result(id, None, Some(42));
        let mut next_timeout = None;
        let req = q.fetch_next_result(&mut next_timeout).unwrap();
        assert_eq!(req.output, Some(42));
        assert_eq!(req.state, RequestState::Returned);
    }

    #[test]
    fn fetch_next_result_reports_min_deadline_when_empty() {
        let q: RequestQueue<Kind, u32, u32, String> = RequestQueue::new();
        let t1 = q.post(Kind::Ping, 1);
        let t2 = q.post(Kind::Ping, 2);
        q.with_request(t1, |r| r.next_timeout_ms = 500);
        q.with_request(t2, |r| r.next_timeout_ms = 100);
        let mut next_timeout = None;
        assert!(q.fetch_next_result(&mut next_timeout).is_none());
        assert_eq!(next_timeout, Some(100));
    }

    #[test]
    fn mark_processed_only_from_returned() {
        let q: RequestQueue<Kind, u32, u32, String> = RequestQueue::new();
        let id = q.post(Kind::Ping, 1);
        assert!(!q.mark_processed(id)); // still New
        q.set_result(id, None, Some(1));
        assert!(q.mark_processed(id));
        assert!(!q.mark_processed(id)); // already Processed
    }

    #[test]
    fn post_result_is_immediately_returned() {
        let q: RequestQueue<Kind, u32, u32, String> = RequestQueue::new();
        let id = q.post_result(Kind::Ping, None, Some(9));
        let mut next_timeout = None;
        let req = q.fetch_next_result(&mut next_timeout).unwrap();
        assert_eq!(req.id, id);
        assert_eq!(req.output, Some(9));
    }
}

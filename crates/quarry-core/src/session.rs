//! Request coalescing for interactive callers.
//!
//! Every request takes a ticket. Issuing a newer ticket of the same kind
//! makes older ones stale, and a stale result is dropped instead of being
//! delivered over a newer one.

use std::time::Duration;

use parking_lot::Mutex;

use crate::query::guards::{HOVER_DEBOUNCE_MS, QUERY_DEBOUNCE_MS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Live search-as-you-type.
    Query,
    /// Hover preview.
    Hover,
    /// Jump to definition or a method-exists check.
    Definition,
}

impl RequestKind {
    fn slot(self) -> usize {
        match self {
            RequestKind::Query => 0,
            RequestKind::Hover => 1,
            RequestKind::Definition => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub kind: RequestKind,
    pub sequence: u64,
}

#[derive(Default)]
struct SessionState {
    sequence: u64,
    latest: [u64; 3],
}

pub struct QuerySession {
    query_window: Duration,
    hover_window: Duration,
    state: Mutex<SessionState>,
}

impl Default for QuerySession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuerySession {
    pub fn new() -> Self {
        Self::with_windows(
            Duration::from_millis(QUERY_DEBOUNCE_MS),
            Duration::from_millis(HOVER_DEBOUNCE_MS),
        )
    }

    pub fn with_windows(query_window: Duration, hover_window: Duration) -> Self {
        Self {
            query_window,
            hover_window,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Coalescing window for `kind`. Definition requests are not delayed.
    pub fn window(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::Query => self.query_window,
            RequestKind::Hover => self.hover_window,
            RequestKind::Definition => Duration::ZERO,
        }
    }

    /// Take a ticket, superseding every earlier ticket of the same kind.
    pub fn issue(&self, kind: RequestKind) -> Ticket {
        let mut state = self.state.lock();
        state.sequence += 1;
        let sequence = state.sequence;
        state.latest[kind.slot()] = sequence;
        Ticket { kind, sequence }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.state.lock().latest[ticket.kind.slot()] == ticket.sequence
    }

    /// Deliver `result` only if `ticket` is still the newest of its kind.
    pub fn complete<T>(&self, ticket: Ticket, result: T) -> Option<T> {
        self.is_current(ticket).then_some(result)
    }

    /// Take a ticket, wait out the coalescing window, then run `work` unless
    /// a newer request of the same kind arrived meanwhile.
    pub fn debounced<T>(&self, kind: RequestKind, work: impl FnOnce() -> T) -> Option<T> {
        let ticket = self.issue(kind);
        let window = self.window(kind);
        if !window.is_zero() {
            std::thread::sleep(window);
        }
        if !self.is_current(ticket) {
            return None;
        }
        let result = work();
        self.complete(ticket, result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

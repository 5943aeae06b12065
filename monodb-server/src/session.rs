//! Per-connection session state.

use std::net::SocketAddr;
use std::time::Instant;

/// A client session: just enough bookkeeping for a line-oriented connection
/// that doesn't touch storage yet — no auth, no wire-mode negotiation, no
/// subscriptions. Those exist in the teacher's `Session` because its server
/// is a stateful protocol; this one is a stream of statements in, ASTs out.
pub struct Session {
    pub remote_addr: SocketAddr,
    requests_handled: u64,
    connected_at: Instant,
}

impl Session {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Session {
            remote_addr,
            requests_handled: 0,
            connected_at: Instant::now(),
        }
    }

    pub fn record_request(&mut self) {
        self.requests_handled += 1;
    }

    pub fn requests_handled(&self) -> u64 {
        self.requests_handled
    }

    pub fn connected_for(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}

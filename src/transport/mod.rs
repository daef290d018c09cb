//! The networked Share exchanger: one framed stream per ordered pair of
//! players, matching inbound frames to pending promises by PC tag
//! (SPEC_FULL.md §3 "Transport connection", §4.5).
//!
//! Grounded on the teacher's `net::Network`/`net::channel::Channel`
//! (`Box<dyn Channel>` per peer, `TcpChannel` vs `LoopBackChannel`), with
//! the blocking `std::net::TcpStream` + rustls plumbing replaced by async
//! `tokio` I/O and the PC-tag dispatch table SPEC_FULL.md §4.5 requires.

mod connection;
mod local;
mod tcp;

pub(crate) use connection::AbortSignal;
pub use connection::Connection;
pub use local::LocalNetwork;
pub use tcp::{connect_tcp, TcpNetworkConfig};

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::pc::Tag;
use crate::player::PlayerId;

/// The set of connections a runtime holds to every other player, plus a
/// loopback path to itself (mirroring the teacher's `LoopBackChannel`).
/// Every `Connection` here shares one [`AbortSignal`]: a malformed frame
/// from any single peer is fatal to the whole player (SPEC_FULL.md §4.5),
/// so it must take down every other connection too, not just the one that
/// received it.
pub struct Network {
    local_id: PlayerId,
    peers: HashMap<PlayerId, Rc<Connection>>,
    abort: Rc<AbortSignal>,
}

impl Network {
    pub(crate) fn new(local_id: PlayerId, peers: HashMap<PlayerId, Rc<Connection>>, abort: Rc<AbortSignal>) -> Self {
        Self { local_id, peers, abort }
    }

    pub fn local_id(&self) -> PlayerId {
        self.local_id
    }

    fn connection(&self, peer: PlayerId) -> Result<&Rc<Connection>, RuntimeError> {
        self.peers.get(&peer).ok_or(RuntimeError::ConnectionLost(peer))
    }

    pub async fn send_to(&self, peer: PlayerId, tag: &Tag, payload: Vec<u8>) -> Result<(), RuntimeError> {
        self.connection(peer)?.send(tag, payload).await
    }

    pub async fn recv_from(&self, peer: PlayerId, tag: &Tag) -> Result<Vec<u8>, RuntimeError> {
        self.connection(peer)?.recv(tag).await
    }

    pub fn peer_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.peers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether a malformed frame from any peer has already aborted this
    /// network (SPEC_FULL.md §7 "abort all peers").
    pub fn is_aborted(&self) -> bool {
        self.abort.aborted_peer().is_some()
    }

    pub async fn close(&self) {
        for conn in self.peers.values() {
            conn.close().await;
        }
    }
}

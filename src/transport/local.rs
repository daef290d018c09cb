//! In-process mesh transport for tests: every pair of players gets an
//! in-memory duplex pipe instead of a TCP socket.
//!
//! Grounded on the teacher's `net::channel::LoopBackChannel`, generalised
//! from "talk to yourself" to a full n-player mesh so integration tests can
//! drive several `PassiveRuntime`s inside one process without touching a
//! real socket (SPEC_FULL.md §8 test scenarios).

use std::collections::HashMap;
use std::rc::Rc;

use crate::player::PlayerId;

use super::{AbortSignal, Connection, Network};

/// A local mesh: one `Network` per player id, each already holding a live
/// `Connection` to every other player. All connections run under the
/// caller's `tokio::task::LocalSet`.
pub struct LocalNetwork;

impl LocalNetwork {
    /// Builds a full mesh among `ids` (no self-connection; a runtime talks
    /// to itself purely locally, as the teacher's loopback channel does,
    /// without going through the transport layer at all).
    pub fn mesh(ids: &[PlayerId]) -> HashMap<PlayerId, Network> {
        let aborts: HashMap<PlayerId, Rc<AbortSignal>> = ids.iter().map(|&id| (id, AbortSignal::new())).collect();
        let mut peers: HashMap<PlayerId, HashMap<PlayerId, std::rc::Rc<Connection>>> =
            ids.iter().map(|&id| (id, HashMap::new())).collect();

        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                let (a_side, b_side) = tokio::io::duplex(1 << 16);
                let (a_read, a_write) = tokio::io::split(a_side);
                let (b_read, b_write) = tokio::io::split(b_side);
                peers
                    .get_mut(&a)
                    .unwrap()
                    .insert(b, Connection::spawn(b, a_read, a_write, aborts[&a].clone()));
                peers
                    .get_mut(&b)
                    .unwrap()
                    .insert(a, Connection::spawn(a, b_read, b_write, aborts[&b].clone()));
            }
        }

        peers
            .into_iter()
            .map(|(id, conns)| (id, Network::new(id, conns, aborts[&id].clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pc::Tag;

    #[tokio::test]
    async fn mesh_wires_every_pair_both_ways() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut networks = LocalNetwork::mesh(&[1, 2, 3]);
                let tag = Tag::from_parts(vec![1]);

                let net1 = networks.remove(&1).unwrap();
                let net2 = networks.remove(&2).unwrap();
                let net3 = networks.remove(&3).unwrap();

                net1.send_to(2, &tag, b"hi-2".to_vec()).await.unwrap();
                net1.send_to(3, &tag, b"hi-3".to_vec()).await.unwrap();
                assert_eq!(net2.recv_from(1, &tag).await.unwrap(), b"hi-2");
                assert_eq!(net3.recv_from(1, &tag).await.unwrap(), b"hi-3");

                net2.send_to(3, &tag, b"2-to-3".to_vec()).await.unwrap();
                assert_eq!(net3.recv_from(2, &tag).await.unwrap(), b"2-to-3");
            })
            .await;
    }
}

//! The runtime base: everything a player needs to run a protocol regardless
//! of which security model implements it (SPEC_FULL.md §3, §5).
//!
//! Grounded on the teacher's `main.rs` (owns the `NetworkConfig`, the
//! `Network`, and drives the players' sequence of sends/receives by hand)
//! and `net::Network`; the per-peer socket list becomes a [`Network`]
//! transport, and the teacher's implicit call-order pairing becomes the
//! explicit [`ProgramCounter`].

pub mod passive;

use crate::error::RuntimeError;
use crate::field::Field;
use crate::pc::ProgramCounter;
use crate::player::{PlayerId, PlayerRegistry};
use crate::transport::Network;

/// Bound on how many times a protocol that can fail on an unlucky public
/// value (PRSS mask lands on zero, a sqrt domain miss) retries with fresh
/// randomness before giving up (SPEC_FULL.md §9, resolving the retry-bound
/// Open Question).
pub const MAX_PROTOCOL_RETRIES: u32 = 64;

/// Player-independent runtime state: identity, the field, the PC, and the
/// transport. [`passive::PassiveRuntime`] wraps this with the actual
/// protocol suite.
pub struct Runtime {
    registry: PlayerRegistry,
    field: Field,
    t: usize,
    pc: ProgramCounter,
    network: Network,
}

impl Runtime {
    pub fn new(registry: PlayerRegistry, field: Field, t: usize, network: Network) -> Result<Self, RuntimeError> {
        if 2 * t >= registry.n() {
            return Err(RuntimeError::Precondition(crate::error::PreconditionError::ThresholdOutOfRange {
                t,
                n: registry.n(),
            }));
        }
        Ok(Self {
            registry,
            field,
            t,
            pc: ProgramCounter::new(),
            network,
        })
    }

    pub fn local_id(&self) -> PlayerId {
        self.registry.local_id()
    }

    pub fn n(&self) -> usize {
        self.registry.n()
    }

    pub fn t(&self) -> usize {
        self.t
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn pc(&self) -> &ProgramCounter {
        &self.pc
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// A barrier every player can call at the same logical point in a
    /// program to make sure nobody races ahead: each player broadcasts a
    /// one-byte token tagged with the current PC and waits for the same
    /// token back from everyone else.
    pub async fn synchronize(&self) -> Result<(), RuntimeError> {
        let tag = self.pc.next_tag();
        for peer in self.registry.peers() {
            self.network.send_to(peer.id, &tag, vec![1]).await?;
        }
        for peer in self.registry.peers() {
            self.network.recv_from(peer.id, &tag).await?;
        }
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.network.close().await;
    }
}

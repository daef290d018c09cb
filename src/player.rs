//! Player identity and network endpoints (SPEC_FULL.md §3 "Player record").
//!
//! Grounded on the teacher's `net::NetworkConfig` (per-peer IP/port list),
//! generalised from a single base-port/IP-list scheme to one host:port per
//! player plus the PRSS key map the teacher's config never carried.

use std::collections::HashMap;
use std::net::SocketAddr;

/// A player's id, 1-indexed to match the Shamir point labels `x_i = 1..=n`
/// (SPEC_FULL.md §3).
pub type PlayerId = u32;

/// A maximal unqualified subset, identified by its sorted member ids
/// (SPEC_FULL.md §4.7).
pub type SubsetId = Vec<PlayerId>;

/// One player's entry in the network, as parsed from the INI configuration
/// (SPEC_FULL.md §6). `prss_keys` is populated only for the local player's
/// own record.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub address: SocketAddr,
    pub prss_keys: HashMap<SubsetId, Vec<u8>>,
}

impl Player {
    pub fn new(id: PlayerId, address: SocketAddr) -> Self {
        Self {
            id,
            address,
            prss_keys: HashMap::new(),
        }
    }
}

/// The full player registry for a run: every player's address, indexed by
/// id, plus which id is "us".
#[derive(Debug, Clone)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
    local_id: PlayerId,
}

impl PlayerRegistry {
    pub fn new(players: HashMap<PlayerId, Player>, local_id: PlayerId) -> Self {
        Self { players, local_id }
    }

    pub fn local_id(&self) -> PlayerId {
        self.local_id
    }

    pub fn local(&self) -> &Player {
        &self.players[&self.local_id]
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn n(&self) -> usize {
        self.players.len()
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.players.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn peers(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(move |p| p.id != self.local_id)
    }
}

//! Shared harness for the integration tests: wires up an in-process mesh of
//! `PassiveRuntime`s, the same way `src/runtime/passive.rs`'s own unit tests
//! do, but parameterised so every scenario can pick its own field and
//! comparison widths.

use std::collections::HashMap;
use std::net::SocketAddr;

use num_bigint::BigUint;

use shami_rs::field::make_field;
use shami_rs::player::{Player, PlayerId, PlayerRegistry};
use shami_rs::runtime::passive::PassiveRuntime;
use shami_rs::runtime::Runtime;
use shami_rs::transport::LocalNetwork;

/// 2^61 - 1, a Blum Mersenne prime, large enough for bit-decomposition-heavy
/// protocols (comparisons, sorting) at realistic widths.
pub fn big_blum_field() -> BigUint {
    BigUint::from((1u64 << 61) - 1)
}

/// Builds one `PassiveRuntime` per id in `ids`, each wired to every other
/// over an in-process mesh rather than real sockets.
pub fn players(ids: &[PlayerId], t: usize, modulus: BigUint, l: u32, k: u32) -> HashMap<PlayerId, PassiveRuntime> {
    let field = make_field(modulus).expect("test modulus must be prime");
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let mut networks = LocalNetwork::mesh(ids);

    ids.iter()
        .map(|&id| {
            let registry_players: HashMap<PlayerId, Player> = ids.iter().map(|&i| (i, Player::new(i, addr))).collect();
            let registry = PlayerRegistry::new(registry_players, id);
            let network = networks.remove(&id).expect("mesh covers every requested id");
            let base = Runtime::new(registry, field.clone(), t, network).expect("valid threshold for the given n, t");
            let rt = PassiveRuntime::new(base, l, k).expect("field is large enough for the chosen l, k");
            (id, rt)
        })
        .collect()
}

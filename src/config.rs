//! INI-style per-run configuration: one `[Player N]` section per player,
//! with the owner's own section carrying a `prss_keys` subsection
//! (SPEC_FULL.md §6). Parsing internals are explicitly out of scope for
//! deep testing (SPEC_FULL.md §2 Non-goals), so this stays a thin
//! `ini`-crate wrapper rather than a hand-rolled parser.
//!
//! Grounded on the teacher's `net::NetworkConfig::new` (reads a JSON file of
//! peer host/ports via `serde_json`); the format changes to INI per this
//! spec, but the shape -- parse a file into a `PlayerRegistry`-like map,
//! fail loudly on a malformed entry -- is the same.

use std::collections::HashMap;
use std::net::SocketAddr;

use ini::Ini;

use crate::error::ConfigError;
use crate::player::{Player, PlayerId, PlayerRegistry, SubsetId};

/// Parses a player configuration file into a [`PlayerRegistry`].
///
/// Expected shape:
/// ```ini
/// [Player 1]
/// host = 127.0.0.1
/// port = 9001
///
/// [Player 2]
/// host = 127.0.0.1
/// port = 9002
/// prss_keys.1 2 = deadbeef
/// ```
/// Exactly one `[Player N]` section may carry a `prss_keys.*` subsection --
/// that `N` is taken to be the local player (SPEC_FULL.md §6, "the owner's
/// prss_keys subsection").
pub fn load(path: &std::path::Path) -> Result<PlayerRegistry, ConfigError> {
    let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut players = HashMap::new();
    let mut owner: Option<PlayerId> = None;

    for (section, props) in ini.iter() {
        let Some(section) = section else { continue };
        let Some(id_str) = section.strip_prefix("Player ") else {
            continue;
        };
        let id: PlayerId = id_str
            .trim()
            .parse()
            .map_err(|_| ConfigError::MalformedPlayerSection(section.to_string()))?;

        let host = props
            .get("host")
            .ok_or_else(|| ConfigError::MalformedPlayerSection(section.to_string()))?;
        let port: u16 = props
            .get("port")
            .ok_or_else(|| ConfigError::MalformedPlayerSection(section.to_string()))?
            .parse()
            .map_err(|_| ConfigError::MalformedPlayerSection(section.to_string()))?;
        let address: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| ConfigError::MalformedPlayerSection(section.to_string()))?;

        let mut player = Player::new(id, address);
        for (key, value) in props.iter() {
            let Some(subset_str) = key.strip_prefix("prss_keys.") else {
                continue;
            };
            if owner.is_some() && owner != Some(id) {
                return Err(ConfigError::AmbiguousOwner);
            }
            owner = Some(id);

            let subset: SubsetId = subset_str
                .split_whitespace()
                .map(|p| p.parse::<PlayerId>())
                .collect::<Result<_, _>>()
                .map_err(|_| ConfigError::MalformedPrssKey(key.to_string()))?;
            let bytes = hex::decode(value).map_err(|_| ConfigError::MalformedPrssKey(key.to_string()))?;
            player.prss_keys.insert(subset, bytes);
        }

        players.insert(id, player);
    }

    let owner = owner.ok_or(ConfigError::MissingPrssKeys)?;
    Ok(PlayerRegistry::new(players, owner))
}

//! Command-line surface for the demo binary (SPEC_FULL.md §2 Non-goals:
//! "CLI parsing internals" are out of scope for deep testing, but the
//! binary still needs one).
//!
//! Grounded on the teacher's `main::Args` (`clap::Parser` with `id`,
//! `net_config_file`, `corruptions`, `input`), extended with the runtime
//! tuning knobs SPEC_FULL.md §3/§9 name (threshold, field bit-length,
//! statistical security parameter, retry/backoff toggles).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "shami-rs", about = "A passively-secure Shamir-sharing MPC runtime")]
pub struct RuntimeArgs {
    /// This process's player id (1-indexed, matching its Shamir point label).
    #[arg(long)]
    pub id: u32,

    /// Path to the INI player configuration (SPEC_FULL.md §6).
    #[arg(long)]
    pub config: PathBuf,

    /// Shamir privacy threshold t (honest majority requires 2t < n).
    #[arg(long)]
    pub threshold: usize,

    /// Bit length of secret inputs, `l` in the field-size bound
    /// `log2(p) > l + k + log2(n) + 1`.
    #[arg(long, default_value_t = 32)]
    pub bit_length: u32,

    /// Statistical security parameter `k` for the comparison protocols.
    #[arg(long, default_value_t = 30)]
    pub security_parameter: u32,

    /// Decimal prime modulus for the field F_p (SPEC_FULL.md §4.1); must be
    /// a Blum prime if the run needs `sqrt`-based protocols (random bits,
    /// comparisons).
    #[arg(long)]
    pub modulus: String,

    /// The player's own secret input to the demo multiplication circuit.
    #[arg(long)]
    pub input: u64,

    /// Disables the exponential-backoff retry when dialing a peer that
    /// isn't listening yet (SPEC_FULL.md §4.5); useful for tests that want
    /// to fail fast instead of waiting out the full backoff.
    #[arg(long, default_value_t = false)]
    pub no_socket_retry: bool,

    /// Suppresses the `env_logger` init the binary otherwise performs,
    /// letting an embedder install its own subscriber first.
    #[arg(long, default_value_t = false)]
    pub no_log: bool,

    /// Repeatable `id=host:port` override, applied on top of the config
    /// file (handy for tests that spin up players on ephemeral ports).
    #[arg(long = "host-override", value_parser = parse_host_override)]
    pub host_overrides: Vec<(u32, std::net::SocketAddr)>,
}

fn parse_host_override(raw: &str) -> Result<(u32, std::net::SocketAddr), String> {
    let (id, addr) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected id=host:port, got {raw:?}"))?;
    let id: u32 = id.parse().map_err(|_| format!("{id:?} is not a player id"))?;
    let addr = addr.parse().map_err(|_| format!("{addr:?} is not a host:port"))?;
    Ok((id, addr))
}

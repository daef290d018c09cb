//! Demo binary: wires a CLI-configured [`PassiveRuntime`] up to TCP peers
//! and runs the same "share inputs, multiply them all together, open the
//! result" circuit the teacher's `main.rs` ran, generalised from a fixed
//! 2-or-3-party demo to however many players the config file lists.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use num_bigint::BigUint;

use shami_rs::cli::RuntimeArgs;
use shami_rs::field::make_field;
use shami_rs::runtime::passive::PassiveRuntime;
use shami_rs::runtime::Runtime;
use shami_rs::transport::{connect_tcp, TcpNetworkConfig};
use shami_rs::{config, player::PlayerRegistry};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let args = RuntimeArgs::parse();
    if !args.no_log {
        env_logger::Builder::new().filter_level(log::LevelFilter::Info).init();
    }

    let mut registry = config::load(&args.config).context("loading player configuration")?;
    apply_host_overrides(&mut registry, &args.host_overrides);

    let modulus = BigUint::parse_bytes(args.modulus.as_bytes(), 10).context("--modulus is not a decimal integer")?;
    let field = make_field(modulus).context("constructing the field")?;

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let mut tcp_cfg = TcpNetworkConfig::default();
            if args.no_socket_retry {
                tcp_cfg.max_attempts = 1;
            }
            log::info!("player {} connecting to {} peers", args.id, registry.n() - 1);
            let network = connect_tcp(&registry, &tcp_cfg).await.context("connecting to peers")?;

            let base = Runtime::new(registry, field.clone(), args.threshold, network)?;
            let rt = PassiveRuntime::new(base, args.bit_length, args.security_parameter)?;

            let secret = field.from_u64(args.input);
            let mut ids = rt.base().registry().ids();
            ids.sort_unstable();

            let mut product = None;
            for owner in ids {
                let value = if owner == rt.base().local_id() {
                    Some(secret.clone())
                } else {
                    None
                };
                let share = rt.share_value(value, owner).await.context("distributing an input")?;
                product = Some(match product {
                    None => share,
                    Some(acc) => rt.mul(&acc, &share).await.context("multiplying shares")?,
                });
            }
            let product = product.expect("at least one player shares an input");

            let result = rt.open(&product).await.context("opening the final product")?;
            log::info!("product of all players' inputs: {}", result.value());

            rt.shutdown().await;
            Ok(())
        })
        .await
}

fn apply_host_overrides(registry: &mut PlayerRegistry, overrides: &[(u32, std::net::SocketAddr)]) {
    for &(id, addr) in overrides {
        if let Some(player) = registry.get_mut(id) {
            player.address = addr;
        }
    }
}

//! shade-relayer - broker withdrawals for the shade privacy pool
//!
//! usage:
//!   shade-relayer --config config.json --port 8080
//!
//! the process exits 0 on clean shutdown and 1 when initialization
//! fails (bad config, unreachable artifacts, store open failure).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shade_relayer::relay::{artifact_backend, RelayerService};
use shade_relayer::store::RequestStore;
use shade_relayer::{http, RelayerConfig};

/// shade-relayer - broker withdrawals for the shade privacy pool
#[derive(Parser)]
#[command(name = "shade-relayer")]
#[command(about = "withdrawal relayer for the shade privacy pool")]
#[command(version)]
struct Args {
    /// path to the json configuration
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // a permuted signal layout or drifted poseidon parameterization must
    // never reach traffic
    shade_prover::signals::assert_signal_order();
    if !shade_core::poseidon::self_check() {
        bail!("poseidon implementations disagree; refusing to start");
    }

    let config = RelayerConfig::load(&args.config).context("loading config")?;
    info!(
        chains = config.chains.len(),
        db = %config.db_path.display(),
        "configuration loaded"
    );

    let store = RequestStore::open(&config.db_path).context("opening request store")?;
    let artifacts = shade_prover::ArtifactStore::init(&artifact_backend(&config.artifacts))
        .await
        .context("initializing circuit artifacts")?;

    let service = Arc::new(RelayerService::new(&config, store, artifacts)?);
    http::serve(service, &config, &args.bind, args.port).await
}

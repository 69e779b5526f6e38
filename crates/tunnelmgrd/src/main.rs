//! Tunnel Manager Daemon Entry Point

use anyhow::Context;
use sonic_cfgmgr_common::ConfigTree;
use sonic_tunnelmgrd::{IpTunnelDriver, TunnelMgr, TunnelMgrConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable naming the tunnel to reconcile.
const IFNAME_ENV: &str = "TUNNEL_IFNAME";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!("{:#}", e);
        println!("{}", e.root_cause());
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let ifname = std::env::var(IFNAME_ENV).with_context(|| format!("{} is not set", IFNAME_ENV))?;
    let config = TunnelMgrConfig::load().context("Failed to load tunnelmgrd configuration")?;

    info!(ifname = %ifname, dry_run = config.dry_run, "Starting tunnelmgrd");

    let store = ConfigTree::from_files(&config.current_config, &config.effective_config)
        .context("Failed to read configuration snapshots")?;

    let driver = if config.dry_run {
        IpTunnelDriver::dry_run()
    } else {
        IpTunnelDriver::new()
    };

    let mut mgr = TunnelMgr::new(ifname, driver);
    let result = mgr.reconcile(&store).await;
    for advisory in mgr.advisories() {
        println!("{}", advisory);
    }
    result?;
    Ok(())
}

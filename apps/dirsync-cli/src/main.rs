//! dirsync - batch synchronization of directory groups into Zabbix.
//!
//! Reads one TOML configuration file, connects to the directory and the
//! Zabbix API, reconciles every configured group once and exits. Exit code
//! is 0 on success (including runs that changed nothing) and 1 on a fatal
//! error.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dirsync_engine::ReconciliationEngine;
use dirsync_ldap::LdapDirectory;
use dirsync_zabbix::ZabbixClient;

mod config;

use config::AppConfig;

/// Synchronize directory group membership and contact media into Zabbix.
#[derive(Parser)]
#[command(name = "dirsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Compute and log every action without applying any change
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Delete accounts that left their directory group (umbrella-gated)
    #[arg(long)]
    delete_orphans: bool,

    /// Remove absent accounts from groups without deleting them
    #[arg(long)]
    remove_absent: bool,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!(error = %e, "synchronization failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> dirsync_core::error::SyncResult<()> {
    let mut config = AppConfig::load(&cli.config)?;

    // Command-line flags extend the file, they never unset it.
    config.sync.dry_run |= cli.dry_run;
    config.sync.delete_orphans |= cli.delete_orphans;
    config.sync.remove_absent |= cli.remove_absent;
    config.sync.validate()?;

    info!(
        config = %cli.config.display(),
        groups = config.sync.groups.len(),
        dry_run = config.sync.dry_run,
        "starting synchronization"
    );

    let directory = Arc::new(LdapDirectory::new(config.ldap)?);
    let target = Arc::new(ZabbixClient::new(config.zabbix)?);
    let engine = ReconciliationEngine::new(directory, target, config.sync);

    let summary = engine.run().await?;
    info!(?summary, changed = summary.has_changes(), "finished");
    Ok(())
}

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod datastore;
pub mod debounce;
pub mod filter;
pub mod render;
pub mod seo;
pub mod sitemap;
pub mod storage;
pub mod task;
pub mod url_state;
pub mod validation;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting taskdash"
    );

    let mut cfg = config::Config::load(cli.config.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value)),
    );
    debug!(files = ?cfg.loaded_files, "configuration loaded");

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let ctx = commands::AppContext::open(cfg, data_dir)?;
    let command = cli
        .command
        .unwrap_or_else(|| cli::Command::Home(cli::DashboardArgs::default()));

    runtime.block_on(commands::dispatch(&ctx, command))?;

    info!("done");
    Ok(())
}

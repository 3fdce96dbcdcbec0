// src/main.rs
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use emtplot::cli::Cli;
use emtplot::session::run_jobs;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli.into_session().context("failed to prepare plot session")?;
    info!(
        "{} job(s), bases {:.3} kV LN / {} MVA",
        config.jobs.len(),
        config.base.kv_ln(),
        config.base.mva()
    );
    let figures = run_jobs(&config).context("plot session failed")?;
    info!("{} figure(s) done", figures.len());
    Ok(())
}

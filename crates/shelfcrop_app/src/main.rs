//! `shelfcrop`: harvest product images, crop the shelf regions an oracle finds in them.
mod config;
mod run;
mod summary;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use shelfcrop_logging::{pipeline_info, LogDestination};

use crate::run::Candidates;

#[derive(Debug, Parser)]
#[command(name = "shelfcrop", version, about)]
struct Cli {
    /// RON run configuration; defaults are used for anything it leaves out.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Search query; overrides the configured one.
    #[arg(long)]
    query: Option<String>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    batch_size: Option<usize>,
    /// Harvest the URLs listed in this file instead of searching.
    #[arg(long)]
    urls: Option<PathBuf>,
    /// Also write the log to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Log to `--log-file` only, keeping the terminal quiet.
    #[arg(long, requires = "log_file")]
    log_only: bool,
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) if self.log_only => LogDestination::File(path.clone()),
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    shelfcrop_logging::initialize(cli.log_destination(), level);

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(query) = cli.query {
        config.query = query;
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;

    let candidates = match &cli.urls {
        Some(path) => Candidates::List(
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        ),
        None => Candidates::Search,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let summary = runtime.block_on(run::run(&config, candidates))?;
    let path = summary.write(&config.output_dir)?;

    pipeline_info!(
        "Done: {} images, {} with regions, {} regions kept, summary at {}",
        summary.images_processed,
        summary.images_with_regions,
        summary.regions_persisted,
        path.display()
    );
    Ok(())
}

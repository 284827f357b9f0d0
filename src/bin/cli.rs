//! bugsync CLI
//!
//! Thin entry point around the sync orchestrator; state is kept in memory,
//! so every run prints what it gathered and exits.

use clap::Parser;

use bugsync::{
    config::{DetailLevel, SyncConfig},
    error::Result,
    pipeline::SyncOrchestrator,
    storage::MemoryStateStore,
};

/// bugsync - incremental Bugzilla issue sync
#[derive(Parser, Debug)]
#[command(name = "bugsync", version, about = "Incremental Bugzilla issue sync")]
struct Cli {
    /// Tracker URL, including an optional product filter
    #[arg(short, long)]
    url: String,

    /// Number of XML issues to get per query
    #[arg(long, default_value_t = 200)]
    nissues: usize,

    /// list, issue or change detail
    #[arg(long, default_value = "change")]
    detail: String,

    /// Delay between requests in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    delay: u64,

    /// Start from the beginning of time instead of the last watermark
    #[arg(long)]
    no_incremental: bool,

    /// Rebuild issues from the local cache, skipping the network
    #[arg(long)]
    replay: bool,

    /// Skip writing fetched raw data to the local cache
    #[arg(long)]
    no_cache: bool,

    /// Directory for the local cache
    #[arg(long, default_value = "cache")]
    cache_dir: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = SyncConfig::new(cli.url);
    config.batch_size = cli.nissues;
    config.detail = cli.detail.parse::<DetailLevel>()?;
    config.incremental = !cli.no_incremental;
    config.replay = cli.replay;
    config.cache = !cli.no_cache;
    config.cache_dir = cli.cache_dir;
    config.http.request_delay_ms = cli.delay;

    let mut store = MemoryStateStore::default();
    let records = SyncOrchestrator::new(&config, &mut store).run()?;

    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    log::info!("Done! {} issue(s) gathered.", records.len());

    Ok(())
}

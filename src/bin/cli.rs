//! Rent Monitor CLI
//!
//! Entry point for scheduled runs (cron, CI) and local inspection.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rent_monitor::{
    error::Result,
    models::{Config, ConfigOverrides},
    pipeline,
    services::{ConsoleNotifier, HttpFetcher, Notifier, SlackWebhook},
    storage::{LocalStorage, SeenStore, StateOrigin},
};

/// Rent Monitor - rental listing watcher
#[derive(Parser, Debug)]
#[command(
    name = "rent-monitor",
    version,
    about = "Posts newly listed rentals from search result pages to a chat webhook"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "monitor.toml")]
    config: PathBuf,

    /// Path to the seen-set state file (overrides state.path)
    #[arg(long)]
    state: Option<PathBuf>,

    /// Single search result URL
    #[arg(long, env = "SEARCH_URL", hide_env_values = true)]
    search_url: Option<String>,

    /// Search result URLs, comma or newline separated
    #[arg(long, env = "SEARCH_URLS", hide_env_values = true)]
    search_urls: Option<String>,

    /// Incoming webhook URL
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    webhook_url: Option<String>,

    /// Send a message even when nothing new was found (1/true/yes/on)
    #[arg(long, env = "SLACK_NOTIFY_ON_NO_NEW")]
    notify_on_no_new: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch sources once and notify about new listings
    Run {
        /// Print the message instead of posting it and leave state untouched
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration
    Validate,

    /// Show seen-set state info
    Info,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            search_url: self.search_url.clone(),
            search_urls: self.search_urls.clone(),
            webhook_url: self.webhook_url.clone(),
            notify_on_no_new: self.notify_on_no_new.clone(),
            state_path: self.state.clone(),
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = execute(cli).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let mut config = if cli.config.exists() {
        let config = Config::load_or_default(&cli.config);
        log::info!("Loaded configuration from {}", cli.config.display());
        config
    } else {
        log::debug!("No config file at {}; using defaults", cli.config.display());
        Config::default()
    };
    config.apply_overrides(cli.overrides());

    match cli.command {
        Command::Run { dry_run } => {
            config.validate()?;
            config.require_run_inputs(dry_run)?;

            let fetcher = HttpFetcher::from_config(&config.crawler)?;
            let notifier: Box<dyn Notifier> = if dry_run {
                log::info!("Dry run: messages go to stdout, state is not written");
                Box::new(ConsoleNotifier)
            } else {
                Box::new(SlackWebhook::from_config(&config.notify)?)
            };
            let store = if dry_run {
                LocalStorage::read_only(&config.state.path)
            } else {
                LocalStorage::open(
                    &config.state.path,
                    Duration::from_secs(config.state.stale_lock_secs),
                )?
            };

            let report = pipeline::run_monitor(&config, &fetcher, notifier.as_ref(), &store).await?;

            log::info!(
                "Run complete in {}s: {} fetched, {} new, baseline={}, notified={}, persisted={}",
                (report.finished_at - report.started_at).num_seconds(),
                report.fetched,
                report.new_ids.len(),
                report.baseline,
                report.notified,
                report.persisted
            );
            if report.source_failures > 0 {
                log::warn!(
                    "{} of {} source(s) failed",
                    report.source_failures,
                    report.sources
                );
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} site rules, {} sources)",
                config.sites.len(),
                config.monitor.search_urls.len()
            );

            if let Err(e) = config.require_run_inputs(false) {
                log::warn!("Not ready for a live run: {}", e);
            } else {
                log::info!("All validations passed!");
            }
        }

        Command::Info => {
            let store = LocalStorage::read_only(&config.state.path);
            log::info!("State file: {}", store.path().display());

            let state = store.load().await;
            match state.origin {
                StateOrigin::Missing => {
                    log::info!("No state file yet (next run is a baseline run)")
                }
                StateOrigin::Recovered => {
                    log::warn!("State file is unreadable; next run starts empty")
                }
                StateOrigin::Loaded => {
                    log::info!("Seen identifiers: {}", state.ids.len());
                    match state.updated_at {
                        Some(updated) => log::info!("Last updated: {}", updated.to_rfc3339()),
                        None => log::info!("Last updated: unknown"),
                    }
                }
            }
        }
    }

    Ok(())
}

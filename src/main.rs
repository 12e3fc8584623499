mod fetch;
mod fingerprint;
mod run;
mod store;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use invite2ical_core::config::AppConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fetch::ImapSource;
use run::{EXIT_FAILURE, RunOutcome};

#[derive(Parser)]
#[command(name = "invite2ical")]
#[command(about = "Collect calendar invites from a mailbox into a single .ics file")]
#[command(
    after_help = "Exit status: 0 = calendar unchanged, 1 = calendar changed, 2 = error"
)]
struct Cli {
    /// Configuration file (defaults to ./config.toml, then ~/.config/invite2ical/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fetch and merge, but neither write the calendar nor mark mail as read
    #[arg(long)]
    dry_run: bool,

    /// Log merge decisions for every event
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(outcome) => {
            info!(?outcome, dry_run = cli.dry_run, "Done");
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn execute(cli: &Cli) -> Result<RunOutcome> {
    let config_path = AppConfig::resolve_path(cli.config.as_deref())?;
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let settings = &config.invite2ical;

    let mut source = ImapSource::connect(&settings.email)?;
    let outcome = run::run(settings, &mut source, cli.dry_run);
    source.logout();

    outcome
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

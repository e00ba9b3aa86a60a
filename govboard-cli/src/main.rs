//! govboard CLI - Cardano governance dashboard jobs and API server
//!
//! - Koios reconcilers for network totals, proposals, pools, DReps and the
//!   constitutional committee (`sync`)
//! - GitHub, npm and Binance collectors (`github`, `npm`, `price`)
//! - Stake pool relay geolocation (`locations`)
//! - The dashboard HTTP API (`serve`)

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod config;
mod tracing_setup;
mod ui;

use config::GovboardConfig;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "govboard",
    author,
    version,
    about = "Cardano governance dashboard: sync jobs, collectors and API server"
)]
struct Cli {
    /// Debug logging with targets (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress progress spinners and info logs
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Export traces over OTLP (requires the telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile Koios data into Postgres
    Sync(commands::sync::SyncArgs),
    /// GitHub repository activity
    Github(commands::github::GithubArgs),
    /// Collect npm download stats
    Npm(commands::npm::NpmArgs),
    /// Daily close price from Binance
    Price(commands::price::PriceArgs),
    /// Geolocate stake pool relays
    Locations(commands::locations::LocationsArgs),
    /// Run the dashboard HTTP API
    Serve(commands::serve::ServeArgs),
    /// Show configuration (show, path)
    Config(config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Before tracing so RUST_LOG from .env applies
    config::load_dotenv();
    tracing_setup::init(&TracingConfig {
        debug: cli.debug,
        quiet: cli.quiet,
        otel: cli.otel,
    })
    .ok();
    ui::init_quiet_mode(cli.quiet);

    let config = GovboardConfig::load();
    let result = match cli.command {
        Commands::Sync(args) => commands::run_sync(args, &config).await,
        Commands::Github(args) => commands::run_github(args, &config).await,
        Commands::Npm(args) => commands::run_npm(args, &config).await,
        Commands::Price(args) => commands::run_price(args).await,
        Commands::Locations(args) => commands::run_locations(args, &config).await,
        Commands::Serve(args) => commands::run_serve(args, &config).await,
        Commands::Config(args) => config::run_config(args, &config),
        Commands::Completions(args) => run_completions(args),
    };

    tracing_setup::shutdown_otel();
    result
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["govboard", "sync", "spos", "--dry-run", "--debug"]).unwrap();
        assert!(cli.debug);
        match cli.command {
            Commands::Sync(args) => assert!(args.dry_run),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn price_rejects_malformed_date() {
        assert!(Cli::try_parse_from(["govboard", "price", "--date", "15/10/2026"]).is_err());
        assert!(Cli::try_parse_from(["govboard", "price", "--date", "2026-10-15"]).is_ok());
    }
}

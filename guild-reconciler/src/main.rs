//! Guild Reconciler CLI
//!
//! Entry point for the reconciler binary. Provides subcommands for:
//! - `run` - Start the engine
//! - `version` - Show version information

use clap::{Parser, Subcommand};
use guild_reconciler::config::Settings;
use tracing::info;

/// Guild reconciliation engine
#[derive(Parser, Debug)]
#[command(name = "guild-reconciler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Environment name (selects config/{environment}.toml)
    #[arg(short, long, default_value = "development")]
    environment: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reconciliation engine
    Run,

    /// Show version information
    Version,
}

fn init_logging(settings: &Settings) {
    let format = settings.logging.format.clone();
    let builder = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_new(&settings.logging.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    );

    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> std::process::ExitCode {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let settings = match Settings::load(&cli.environment) {
                Ok(settings) => settings,
                Err(err) => {
                    eprintln!("failed to load configuration: {err}");
                    return std::process::ExitCode::FAILURE;
                }
            };

            // Fatal configuration problems abort at boot
            if let Err(errors) = settings.validate() {
                eprintln!("invalid configuration:");
                for error in errors {
                    eprintln!("  - {error}");
                }
                return std::process::ExitCode::FAILURE;
            }

            init_logging(&settings);
            info!(
                version = guild_reconciler::VERSION,
                environment = %cli.environment,
                indexer = %settings.indexer.url,
                "Starting guild reconciler"
            );

            // TODO: wire the platform gateway and role-link adapters once
            // their client crates land, then build the GuildEngine here
            // and start one processor/scheduler pair per joined guild.
            eprintln!("engine startup requires the platform adapter; see the library crate");
            std::process::ExitCode::FAILURE
        }
        Commands::Version => {
            println!("guild-reconciler {}", guild_reconciler::VERSION);
            std::process::ExitCode::SUCCESS
        }
    }
}

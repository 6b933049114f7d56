mod commands;
mod config;
mod context;
mod error;
mod identity;
mod migration;
mod output;
mod reconcile;
mod report;
mod state;
mod traits;
mod warnings;

#[cfg(test)]
mod test_helpers;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{FormatsCommand, ResolveCommand, RunArgs, RunCommand};
use context::Context;
use tracing_subscriber::EnvFilter;

/// Exit status for a successful run that found changes (`--detailed-exitcode`)
const EXIT_CHANGES_FOUND: i32 = 2;

#[derive(Parser)]
#[command(name = "tfreconcile")]
#[command(
    about = "Reconcile Terraform state with what is actually deployed in the cloud",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare desired and observed state and write the run artifacts
    Run(RunArgs),

    /// Show the identities derived for a single resource
    Resolve {
        /// Provider (aws, azurerm, google)
        provider: String,

        /// Resource type, e.g. google_storage_bucket
        resource_type: String,

        /// Raw resource name, used to show the composite key
        #[arg(short, long)]
        name: Option<String>,

        /// Resource attribute as key=value (repeatable)
        #[arg(short, long = "attr", value_name = "KEY=VALUE")]
        attributes: Vec<String>,

        /// Run configuration file providing extra import formats
        #[arg(short, long, env = "TFRECONCILE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Inspect the import format table
    Formats {
        #[command(subcommand)]
        command: FormatsSubcommand,
    },
}

#[derive(Subcommand)]
enum FormatsSubcommand {
    /// List resource types with an import format
    List {
        /// Only list this provider
        provider: Option<String>,

        /// Run configuration file providing extra import formats
        #[arg(short, long, env = "TFRECONCILE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Show the import format of one resource type
    Show {
        /// Provider (aws, azurerm, google)
        provider: String,

        /// Resource type
        resource_type: String,

        /// Run configuration file providing extra import formats
        #[arg(short, long, env = "TFRECONCILE_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context::new();

    match cli.command {
        Commands::Run(args) => {
            let changes_found = RunCommand::execute(&ctx, &args)?;
            if args.detailed_exitcode && changes_found {
                std::process::exit(EXIT_CHANGES_FOUND);
            }
        }
        Commands::Resolve {
            provider,
            resource_type,
            name,
            attributes,
            config,
        } => {
            ResolveCommand::execute(
                &ctx,
                &provider,
                &resource_type,
                name.as_deref(),
                &attributes,
                config.as_deref(),
            )?;
        }
        Commands::Formats { command } => match command {
            FormatsSubcommand::List { provider, config } => {
                FormatsCommand::list(&ctx, provider.as_deref(), config.as_deref())?;
            }
            FormatsSubcommand::Show {
                provider,
                resource_type,
                config,
            } => {
                FormatsCommand::show(&ctx, &provider, &resource_type, config.as_deref())?;
            }
        },
    }

    Ok(())
}

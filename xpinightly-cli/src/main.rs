//! xpinightly - command-line interface
//!
//! Packages an extension build as a dated nightly and publishes it to the
//! configured downloads repository.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use console::style;
use xpinightly::logging::{self, WorkerGuard};

use commands::downloads::UploadArgs;
use commands::publish::PublishArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "xpinightly", version, about = "Package and publish nightly extension builds")]
struct Cli {
    /// Config file (default: ./config.ini, then the user config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build, upload, prune and publish the update descriptor
    Publish(PublishArgs),
    /// List hosted downloads
    List,
    /// Delete a download by id or name
    Delete {
        /// Numeric id or download name
        #[arg(value_name = "ID|NAME")]
        target: String,
    },
    /// Upload a single file
    Upload(UploadArgs),
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Publish(args) => commands::publish::run(config, args),
        Commands::List => commands::downloads::list(config),
        Commands::Delete { target } => commands::downloads::delete(config, &target),
        Commands::Upload(args) => commands::downloads::upload(config, args),
    }
}

fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>, CliError> {
    Ok(logging::init(cli.verbose, cli.log_file.as_deref())?)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

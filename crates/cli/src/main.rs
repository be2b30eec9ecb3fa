use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pinsh_lib::consts::PINS_FILENAME;

mod cmd;
mod output;

/// Exit code reserved for provisioning failures, distinct from any exit
/// code of the launched command.
const EXIT_PROVISION_FAILURE: u8 = 125;

/// pinsh - reproducible pinned development environments
#[derive(Parser)]
#[command(name = "pinsh")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Path to the pin file
  #[arg(short = 'f', long, global = true, default_value = PINS_FILENAME)]
  pins: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a command inside the provisioned environment
  Run {
    /// Command and arguments to run
    #[arg(required = true, trailing_var_arg = true)]
    command: Vec<String>,
  },

  /// Launch an interactive shell inside the provisioned environment
  Shell,

  /// Print the resolved environment
  Env {
    /// Print as JSON
    #[arg(long)]
    json: bool,
  },

  /// Manage the local content store
  Store {
    #[command(subcommand)]
    command: cmd::store::StoreCommands,
  },
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  let result = match cli.command {
    Commands::Run { command } => cmd::cmd_run(&cli.pins, &command),
    Commands::Shell => cmd::cmd_shell(&cli.pins),
    Commands::Env { json } => cmd::cmd_env(&cli.pins, json).map(|()| 0),
    Commands::Store { command } => cmd::cmd_store(command).map(|()| 0),
  };

  match result {
    Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
    Err(e) => {
      output::print_error(&format!("{:#}", e));
      ExitCode::from(EXIT_PROVISION_FAILURE)
    }
  }
}

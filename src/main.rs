mod build;
mod catalog;
mod commands;
mod core;
mod gate;
mod matrix;
mod orchestrate;
mod package;
mod release;
mod staging;
mod ui;

use clap::{Parser, Subcommand};
use commands::{ReleaseArgs, TriggerArgs};
use core::context::ProjectContext;
use core::error::{ShipError, print_error};
use tracing_subscriber::EnvFilter;

/// Fan out cross-platform builds, package them, and replace a tagged release
#[derive(Parser)]
#[command(name = "shipyard")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Debug diagnostics on stderr (RUST_LOG overrides)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Setup & Inspection
  // ============================================================================
  /// Write a default shipyard.toml
  Init {
    /// Overwrite an existing configuration
    #[arg(long)]
    force: bool,
    /// Write the built-in target catalog into the file
    #[arg(long)]
    with_catalog: bool,
  },

  /// Show and validate the target catalog
  Targets {
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show the success ledger, staged runs and releases
  Status {
    /// Look up the release at this tag
    #[arg(long)]
    tag: Option<String>,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  // ============================================================================
  // Release pipeline
  // ============================================================================
  /// Expand the catalog into the job set a run would execute
  Plan {
    #[command(flatten)]
    release: ReleaseArgs,
    /// Output the plan in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Decide whether a trigger proceeds or is skipped as a duplicate
  Gate {
    #[command(flatten)]
    trigger: TriggerArgs,
    /// Evaluate as a mock run
    #[arg(long)]
    mock: bool,
    /// Output the decision in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Gate, build every target in parallel, package, and publish the release
  Run {
    #[command(flatten)]
    trigger: TriggerArgs,
    #[command(flatten)]
    release: ReleaseArgs,
    /// Output the run summary in JSON format (disables progress bars)
    #[arg(long)]
    json: bool,
  },

  /// Remove staging areas past their retention window
  Sweep {
    /// Override `staging.retention_days`
    #[arg(long)]
    retention_days: Option<u32>,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "shipyard=debug" } else { "shipyard=warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let project_root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  // init runs before a configuration exists
  if let Commands::Init { force, with_catalog } = cli.command {
    if let Err(err) = commands::run_init(&project_root, force, with_catalog) {
      handle_error(err);
    }
    return;
  }

  let ctx = match ProjectContext::build(&project_root) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Init { .. } => Ok(()),
    Commands::Targets { json } => commands::run_targets(&ctx, json),
    Commands::Status { tag, json } => commands::run_status(&ctx, tag.as_deref(), json),
    Commands::Plan { release, json } => commands::run_plan(&ctx, &release, json),
    Commands::Gate { trigger, mock, json } => commands::run_gate(&ctx, &trigger, mock, json),
    Commands::Run { trigger, release, json } => commands::run_release(&ctx, &trigger, &release, json),
    Commands::Sweep { retention_days, json } => commands::run_sweep(&ctx, retention_days, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ShipError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

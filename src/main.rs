use std::path::PathBuf;

use clap::{Parser, Subcommand};
use monthly_ledger::pipeline::{self, RunSummary};
use monthly_ledger::settings::PathSettings;
use monthly_ledger::{LedgerError, Result, Settings};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose)?;

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let summary = match cli.command.unwrap_or(Command::Run(PathArgs::default())) {
        Command::Run(args) => {
            args.apply(&mut settings.paths);
            pipeline::run(&settings)?
        }
        Command::Consolidate(args) => {
            args.apply(&mut settings.paths);
            pipeline::consolidate_to_snapshot(&settings)?
        }
        Command::Export(args) => {
            args.apply(&mut settings.paths);
            pipeline::export_snapshot(&settings)?
        }
    };

    report(&summary);
    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| LedgerError::Logging(error.to_string()))
}

fn report(summary: &RunSummary) {
    println!(
        "Done: {} source sheet(s), {} row(s), {} month sheet(s)",
        summary.source_sheets, summary.rows, summary.month_sheets
    );
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Consolidate month-named worksheets into a ledger split by month."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON settings file overriding the built-in layout.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Load, consolidate, snapshot and export (the default).
    Run(PathArgs),
    /// Load and consolidate, writing only the snapshot.
    Consolidate(PathArgs),
    /// Export a previously written snapshot.
    Export(PathArgs),
}

#[derive(clap::Args, Default)]
struct PathArgs {
    /// Source workbook with month-named worksheets.
    #[arg(long)]
    input: Option<PathBuf>,

    /// JSON snapshot of the consolidated table.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Output workbook.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Workbook whose first worksheet is cloned for every month.
    #[arg(long)]
    template: Option<PathBuf>,
}

impl PathArgs {
    fn apply(self, paths: &mut PathSettings) {
        if let Some(input) = self.input {
            paths.input = input;
        }
        if let Some(snapshot) = self.snapshot {
            paths.snapshot = snapshot;
        }
        if let Some(output) = self.output {
            paths.output = output;
        }
        if let Some(template) = self.template {
            paths.template = template;
        }
    }
}

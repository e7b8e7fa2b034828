mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "reminder",
    about = "Reminder notification scheduler: staged notices ahead of each target date",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .reminders/)
    #[arg(long, global = true, env = "REMINDER_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .reminders/config.yaml
    Init,

    /// Run the scheduler: one pass now, then one per interval, until ctrl-c
    Run,

    /// Run a single pass now and print its report
    Pass,

    /// List stored reminders with their current window
    List,

    /// Load owners and reminders from a JSON file
    Import {
        file: PathBuf,

        /// Store reminders without field validation
        #[arg(long)]
        no_validate: bool,
    },

    /// Delete every stored reminder
    Purge {
        /// Delete owners as well
        #[arg(long)]
        owners: bool,
    },

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run | Commands::Pass => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Run => cmd::run::run(&root),
        Commands::Pass => cmd::pass::run(&root, cli.json),
        Commands::List => cmd::list::run(&root, cli.json),
        Commands::Import { file, no_validate } => {
            cmd::import::run(&root, &file, !no_validate, cli.json)
        }
        Commands::Purge { owners } => cmd::purge::run(&root, owners, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

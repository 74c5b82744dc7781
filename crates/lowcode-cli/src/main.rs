mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{action::ActionSubcommand, config::ConfigSubcommand, result::ResultSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lowcode",
    about = "Manage and run the data actions of a low-code app",
    version,
    propagate_version = true
)]
struct Cli {
    /// App root (default: auto-detect from .lowcode/)
    #[arg(long, global = true, env = "LOWCODE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a lowcode app in the current directory
    Init {
        /// Id of the app on the builder backend
        #[arg(long)]
        app_id: String,
        /// Backend API base, e.g. http://localhost:8000/api/v1
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Manage the action list
    Action {
        #[command(subcommand)]
        subcommand: ActionSubcommand,
    },

    /// Run an action and store its result
    Run {
        /// Action id or display name
        action: String,
    },

    /// Inspect stored action results
    Result {
        #[command(subcommand)]
        subcommand: ResultSubcommand,
    },

    /// Validate the app configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
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
        Commands::Init { app_id, base_url } => {
            cmd::init::run(&root, &app_id, base_url.as_deref(), cli.json)
        }
        Commands::Action { subcommand } => cmd::action::run(&root, subcommand, cli.json),
        Commands::Run { action } => cmd::run::run(&root, &action, cli.json),
        Commands::Result { subcommand } => cmd::result::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

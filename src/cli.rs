//! CLI argument parsing.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "framebot",
    version,
    about = "Publish a directory of frames to a Facebook page, one at a time",
    after_help = "Commands:\n  init --directory <dir>      Write a starter config.json and frames/ directory\n  run --directory <dir>       Publish pending frames (resumes after the last published one)\n  status --directory <dir>    Show progress and the best-of queue\n  migrate --directory <dir> --legacy <dir>  Import a legacy best-of queue\n\nExamples:\n  framebot init --directory ~/bots/spirited-away\n  FRAMEBOT_ACCESS_TOKEN=... framebot run --directory ~/bots/spirited-away\n  framebot status --directory ~/bots/spirited-away --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Init(InitArgs),
    Status(StatusArgs),
    Migrate(MigrateArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Publish pending frames, then drain the best-of queue")]
pub struct RunArgs {
    /// Bot working directory holding config.json (defaults to the user data dir)
    #[arg(long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Log at debug level unless FRAMEBOT_LOG says otherwise
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Initialize a bot working directory")]
pub struct InitArgs {
    /// Bot working directory holding config.json (defaults to the user data dir)
    #[arg(long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Title shown in captions
    #[arg(long)]
    pub title: Option<String>,

    /// Overwrite an existing config.json
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Summarize progress and the best-of queue")]
pub struct StatusArgs {
    /// Bot working directory holding config.json (defaults to the user data dir)
    #[arg(long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Import a legacy best-of queue into the current layout")]
pub struct MigrateArgs {
    /// Bot working directory holding config.json
    #[arg(long, value_name = "DIR")]
    pub directory: PathBuf,

    /// Legacy bot directory containing the old bofc.json
    #[arg(long, value_name = "DIR")]
    pub legacy: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

impl Command {
    pub fn verbose(&self) -> bool {
        matches!(self, Command::Run(args) if args.verbose)
    }
}

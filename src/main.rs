use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod alternate;
mod best_of;
mod bot;
mod catalog;
mod cli;
mod clock;
mod config;
mod frame;
mod hooks;
mod migrate;
mod paths;
mod persist;
mod progress;
mod social;
#[cfg(test)]
mod testing;
mod workflow;

use cli::{Command, RootArgs};
use social::SocialError;

/// Overrides the default log filter (`info`, or `debug` with `--verbose`).
const LOG_ENV: &str = "FRAMEBOT_LOG";

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());

    let result = match args.command {
        Command::Run(args) => workflow::run_run(args),
        Command::Init(args) => workflow::run_init(args),
        Command::Status(args) => workflow::run_status(args),
        Command::Migrate(args) => workflow::run_migrate(args),
    };
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "framebot stopped");
        let auth_expired = err.chain().any(|cause| {
            cause
                .downcast_ref::<SocialError>()
                .is_some_and(SocialError::is_auth_expired)
        });
        if auth_expired {
            tracing::error!("the access token is no longer valid; set a fresh one and rerun");
        }
    }
    result
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

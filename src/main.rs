mod cli;
mod clipboard;
mod codec;
mod command;
mod editor;
mod shell;
mod sync;

use std::error::Error;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config().unwrap_or_else(|e| {
        eprintln!("clipbench: {e}");
        std::process::exit(1);
    });

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            if let Err(e) = shell::run(config).await {
                tracing::error!(error = %e, "shell failed");
                exit_with("clipbench shell", &e);
            }
        }
        Command::Formats => {
            if let Err(e) = shell::list_formats(&config) {
                tracing::error!(error = %e, "formats failed");
                exit_with("clipbench formats", &e);
            }
        }
        Command::Show { editor } => {
            if let Err(e) = shell::show(&config, editor.as_deref()) {
                tracing::error!(error = %e, "show failed");
                exit_with("clipbench show", &e);
            }
        }
        Command::Run { editor, command } => {
            if let Err(e) = shell::run_once(&config, editor.as_deref(), &command) {
                tracing::error!(error = %e, "run failed");
                exit_with("clipbench run", &e);
            }
        }
    }
}

/// Print `<context>: <error>` and its causes to stderr, then exit 1.
fn exit_with(context: &str, error: &dyn Error) -> ! {
    eprintln!("{context}: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    std::process::exit(1);
}

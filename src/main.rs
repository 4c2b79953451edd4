mod cli;
mod commands;
mod config;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use fdwkit::CancelToken;
use std::io;
use std::time::Duration;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Explicit `--config` path
    pub config: Option<String>,
    /// Connection string from `--connection` or `FDWCTL_CONNECTION`
    pub connection: Option<String>,
    pub cancel: CancelToken,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let cancel = match cli.timeout {
        Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
        None => CancelToken::new(),
    };

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        connection: cli.connection,
        cancel,
    };

    let result = match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::List(args) => commands::list::run(&ctx, args),
        Command::Create(cmd) => commands::create::run(&ctx, cmd),
        Command::Drop(cmd) => commands::drop::run(&ctx, cmd),
        Command::Edit(cmd) => commands::edit::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "fdwctl", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = &result
        && let Some(err) = e.downcast_ref::<fdwkit::Error>()
    {
        let category = err.category();
        ui::error(category.description());
        eprintln!("  {}", category.advice());
    }
    result
}

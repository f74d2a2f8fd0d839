//! `riptide-cli` — administrative CLI over the Riptide storage engine.
//!
//! ```text
//! riptide-cli [--data-dir PATH] [--config FILE] <put|get|delete|scan|flush|compact|split|status|repl>
//! ```
//!
//! With no subcommand, drops into `repl`. Exit code `0` on success, `-1`
//! (255) on an argument error, with usage printed to stderr.

use clap::Parser;

use cli::args::{Cli, Command};
use cli::{commands, repl};

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprint!("{e}");
            std::process::exit(-1);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("error: {e:#}");
        std::process::exit(-1);
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    let node = commands::open_node(&args.data_dir, &args.namespace, &args.table, args.config.as_deref())?;

    match args.command.unwrap_or(Command::Repl) {
        Command::Repl => repl::run(&node),
        other => commands::run(&node, other),
    }
}

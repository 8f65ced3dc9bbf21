//! CLI module for nestdb
//!
//! A demonstration driver around the embedded store:
//! - insert: parse a JSON document and append it
//! - list: dump the live documents as JSON lines
//! - count: print the number of live documents
//! - query: run a comparison query and print the matches
//! - remove: tombstone every record a comparison query matches
//! - compact: export a tombstone-free copy of the file

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command, QueryOp};
pub use commands::run_command;
pub use errors::{CliError, CliResult};

/// Parses arguments and runs the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

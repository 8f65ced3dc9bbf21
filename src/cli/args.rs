//! CLI argument definitions using clap
//!
//! Commands:
//! - nestdb insert <db> <json>
//! - nestdb list <db>
//! - nestdb count <db>
//! - nestdb query <db> --field <f> --op <op> --value <v> [--one]
//! - nestdb remove <db> --field <f> --op <op> --value <v>
//! - nestdb compact <db> <dest>

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// nestdb - an embedded, single-file, hierarchical document store
#[derive(Parser, Debug)]
#[command(name = "nestdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Insert a JSON document into the root collection
    Insert {
        /// Path to the store file
        db: PathBuf,
        /// The document as JSON text
        json: String,
    },

    /// Print every live document as a JSON line
    List {
        /// Path to the store file
        db: PathBuf,
    },

    /// Print the number of live documents
    Count {
        /// Path to the store file
        db: PathBuf,
    },

    /// Run a comparison query and print the matching documents
    Query {
        /// Path to the store file
        db: PathBuf,
        /// Field path to compare (dotted for nested fields)
        #[arg(long)]
        field: String,
        /// Comparison operator
        #[arg(long, value_enum)]
        op: QueryOp,
        /// Operand value
        #[arg(long)]
        value: String,
        /// Stop at the first match
        #[arg(long)]
        one: bool,
    },

    /// Tombstone every record a comparison query matches
    Remove {
        /// Path to the store file
        db: PathBuf,
        /// Field path to compare
        #[arg(long)]
        field: String,
        /// Comparison operator
        #[arg(long, value_enum)]
        op: QueryOp,
        /// Operand value
        #[arg(long)]
        value: String,
    },

    /// Export a tombstone-free copy of the store
    Compact {
        /// Path to the store file
        db: PathBuf,
        /// Path of the compacted copy
        dest: PathBuf,
    },
}

/// Comparison operators accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

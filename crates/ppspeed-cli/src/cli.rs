//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Termination and speed analysis of population protocols via stage trees.\n\n\
    PROTOCOL is either a protocol file in the abstract-protocol JSON format\n\
    or the name of a built-in generator (majority, broadcast, flock) followed\n\
    by its arguments as a JSON array.\n\n\
    Examples:\n  \
    ppspeed analyze majority\n  \
    ppspeed analyze flock '[3]' --tree flock.dot\n  \
    ppspeed analyze protocol.json --out --timeout 60";

#[derive(Parser)]
#[command(name = "ppspeed")]
#[command(about = "Termination and speed analysis of population protocols")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// Log progress at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Build the stage tree and report termination and speed
    Analyze {
        /// Protocol file (.json) or generator name
        protocol: String,

        /// Generator arguments as a JSON array
        args: Option<String>,

        /// Do not add stages deeper than this
        #[arg(short, long)]
        depth: Option<usize>,

        /// Skip termination witness checking
        #[arg(short = 'w', long)]
        no_witness: bool,

        /// Find disabled heads with the transformation graph instead of T-invariants
        #[arg(short, long)]
        implication: bool,

        /// Print the report as JSON
        #[arg(short, long)]
        out: bool,

        /// Write the stage tree in Graphviz DOT format
        #[arg(short, long, value_name = "FILE")]
        tree: Option<PathBuf>,

        /// Leave stage labels out of the DOT export
        #[arg(short = 's', long = "struct")]
        struct_only: bool,

        /// Wall-clock limit in seconds (0 disables)
        #[arg(long, default_value_t = 0)]
        timeout: u64,

        /// Per-query solver limit in seconds (0 disables)
        #[arg(long, default_value_t = 0)]
        solver_timeout: u64,
    },

    /// Print a protocol as loaded
    Show {
        /// Protocol file (.json) or generator name
        protocol: String,

        /// Generator arguments as a JSON array
        args: Option<String>,

        /// Print in the abstract-protocol JSON format
        #[arg(long)]
        json: bool,
    },
}

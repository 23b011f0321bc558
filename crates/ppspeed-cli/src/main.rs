#![doc = include_str!("../README.md")]

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::analyze::AnalyzeConfig;

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze {
            protocol,
            args,
            depth,
            no_witness,
            implication,
            out,
            tree,
            struct_only,
            timeout,
            solver_timeout,
        } => {
            commands::analyze::run_analyze_command(AnalyzeConfig {
                protocol,
                args,
                depth,
                no_witness,
                implication,
                json: out,
                tree,
                struct_only,
                timeout_secs: timeout,
                solver_timeout_secs: solver_timeout,
            })?;
        }
        Commands::Show {
            protocol,
            args,
            json,
        } => {
            commands::show::run_show_command(&protocol, args.as_deref(), json)?;
        }
    }
    Ok(())
}

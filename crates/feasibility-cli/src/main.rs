mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

use commands::dcf::DcfArgs;
use commands::distribute::DistributeArgs;
use commands::feasibility::FeasibilityArgs;
use commands::tax::TaxArgs;

/// Property development feasibility modelling
#[derive(Parser)]
#[command(
    name = "feaso",
    version,
    about = "Property development feasibility modelling",
    long_about = "Runs monthly development feasibilities with decimal precision: cost and \
                  revenue timing, GST, stamp duty and land tax, a senior/mezzanine/equity \
                  capital stack, and IRR/NPV analytics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log to stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full scenario feasibility
    Feasibility(FeasibilityArgs),
    /// Resolve stamp duty or land tax from a bracket table
    Tax(TaxArgs),
    /// Spread an amount across months
    Distribute(DistributeArgs),
    /// NPV and IRR of a cash flow series
    Dcf(DcfArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Filter used when `RUST_LOG` is unset; each `-v` raises the engine's level.
fn default_directive(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    format!("feasibility_core={level}")
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Feasibility(args) => commands::feasibility::run_feasibility_cmd(args),
        Commands::Tax(args) => commands::tax::run_tax(args),
        Commands::Distribute(args) => commands::distribute::run_distribute(args),
        Commands::Dcf(args) => commands::dcf::run_dcf(args),
        Commands::Version => {
            println!("feaso {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_targets_engine() {
        assert_eq!(default_directive(0), "feasibility_core=warn");
        assert_eq!(default_directive(1), "feasibility_core=info");
        assert_eq!(default_directive(2), "feasibility_core=debug");
        assert_eq!(default_directive(5), "feasibility_core=debug");
    }

    #[test]
    fn test_verbose_flag_counts() {
        let cli = Cli::parse_from(["feaso", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        let cli = Cli::parse_from(["feaso", "version"]);
        assert_eq!(cli.verbose, 0);
    }
}

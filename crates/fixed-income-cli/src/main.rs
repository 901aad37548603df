mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::fixed_income::YearFractionArgs;
use commands::InputArgs;

/// Fixed income and credit risk analytics
#[derive(Parser)]
#[command(
    name = "fia",
    version,
    about = "Fixed income and credit risk analytics",
    long_about = "A CLI for bond pricing, yield curve construction, duration and \
                  convexity, yield measures, credit spreads, CDS, CVA and rating \
                  migration, computed with decimal precision. Inputs are JSON or \
                  YAML files, or JSON piped on stdin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log inputs and intermediate steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a bond from its yield (clean, dirty, accrued, cash flows)
    PriceBond(InputArgs),
    /// Yield measures from a market price (YTM, YTC, YTP, YTW)
    BondYield(InputArgs),
    /// Duration, convexity, DV01 and key rate durations
    Duration(InputArgs),
    /// Bootstrap a zero curve from bond prices
    Bootstrap(InputArgs),
    /// Fit a Nelson-Siegel curve to observed yields
    NelsonSiegel(InputArgs),
    /// Fit a Svensson curve to observed yields
    Svensson(InputArgs),
    /// Interpolate zero rates and discount factors on a curve
    Interpolate(InputArgs),
    /// Forward rates implied by a zero curve
    ForwardRate(InputArgs),
    /// G-spread, Z-spread, OAS and implied default probability
    CreditSpreads(InputArgs),
    /// Default probability term structure from credit spreads
    DefaultProbability(InputArgs),
    /// Price a credit default swap
    Cds(InputArgs),
    /// Credit and debit valuation adjustments from an exposure profile
    Cva(InputArgs),
    /// Multi-period rating migration and default probabilities
    Migration(InputArgs),
    /// Year fraction between two dates
    YearFraction(YearFractionArgs),
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

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "fia=debug" } else { "fia=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // stdout carries the results
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::PriceBond(args) => commands::fixed_income::run_bond_pricing(args),
        Commands::BondYield(args) => commands::fixed_income::run_bond_yield(args),
        Commands::Duration(args) => commands::fixed_income::run_duration(args),
        Commands::Bootstrap(args) => commands::fixed_income::run_bootstrap(args),
        Commands::NelsonSiegel(args) => commands::fixed_income::run_nelson_siegel(args),
        Commands::Svensson(args) => commands::fixed_income::run_svensson(args),
        Commands::Interpolate(args) => commands::fixed_income::run_interpolate(args),
        Commands::ForwardRate(args) => commands::fixed_income::run_forward_rate(args),
        Commands::CreditSpreads(args) => commands::fixed_income::run_credit_spreads(args),
        Commands::DefaultProbability(args) => {
            commands::fixed_income::run_default_probability(args)
        }
        Commands::Cds(args) => commands::credit_derivatives::run_cds(args),
        Commands::Cva(args) => commands::credit_derivatives::run_cva(args),
        Commands::Migration(args) => commands::credit_portfolio::run_migration(args),
        Commands::YearFraction(args) => commands::fixed_income::run_year_fraction(args),
        Commands::Version => {
            println!("fia {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

pub mod credit_derivatives;
pub mod credit_portfolio;
pub mod fixed_income;

use clap::Args;

/// Arguments shared by every file- or stdin-driven command.
#[derive(Args)]
pub struct InputArgs {
    /// Path to a JSON or YAML input file (JSON on stdin otherwise)
    #[arg(long)]
    pub input: Option<String>,
}

use serde_json::Value;

use fixed_income_core::credit_portfolio::migration::{self, MigrationInput};

use super::InputArgs;
use crate::input;

pub fn run_migration(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let migration_input: MigrationInput = input::read_input(args.input.as_deref(), "migration")?;
    tracing::debug!(
        ratings = migration_input.transition_matrix.ratings.len(),
        horizon = migration_input.time_horizon_years,
        "projecting rating migration"
    );
    let result = migration::calculate_migration(&migration_input)?;
    Ok(serde_json::to_value(result)?)
}

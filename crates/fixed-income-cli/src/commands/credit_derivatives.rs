use serde_json::Value;

use fixed_income_core::credit_derivatives::cds::{self, CdsInput};
use fixed_income_core::credit_derivatives::cva::{self, CvaInput};

use super::InputArgs;
use crate::input;

pub fn run_cds(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cds_input: CdsInput = input::read_input(args.input.as_deref(), "cds")?;
    tracing::debug!(entity = %cds_input.reference_entity, spread_bps = %cds_input.spread_bps, "pricing CDS");
    let result = cds::price_cds(&cds_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_cva(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cva_input: CvaInput = input::read_input(args.input.as_deref(), "cva")?;
    tracing::debug!(
        points = cva_input.expected_exposure_profile.len(),
        bilateral = cva_input.own_credit.is_some(),
        "computing valuation adjustments"
    );
    let result = cva::calculate_cva(&cva_input)?;
    Ok(serde_json::to_value(result)?)
}

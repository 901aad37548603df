use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Used for probabilities and
/// recovery rates.
pub type Rate = Decimal;

/// Rates on the percentage scale (5 = 5%). Coupons, yields and curve rates.
pub type Percent = Decimal;

/// Basis points (50 = 0.50%). Spreads, margins and shocks.
pub type Bps = Decimal;

/// Year fractions or tenors
pub type Years = Decimal;

const BPS_PER_PERCENT: Decimal = dec!(100);
const HUNDRED: Decimal = dec!(100);

/// Basis points in a whole unit (1.0 = 10,000 bps).
pub const BPS_PER_UNIT: Decimal = dec!(10000);

/// 1.25% -> 125 bps
pub fn percentage_to_bps(pct: Percent) -> Bps {
    pct * BPS_PER_PERCENT
}

/// 125 bps -> 1.25%
pub fn bps_to_percentage(bps: Bps) -> Percent {
    bps / BPS_PER_PERCENT
}

/// 125 bps -> 0.0125
pub fn bps_to_rate(bps: Bps) -> Rate {
    bps / BPS_PER_UNIT
}

/// 5% -> 0.05
pub fn percentage_to_rate(pct: Percent) -> Rate {
    pct / HUNDRED
}

/// 0.05 -> 5%
pub fn rate_to_percentage(rate: Rate) -> Percent {
    rate * HUNDRED
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_bps_conversions() {
        assert_eq!(percentage_to_bps(dec!(1.25)), dec!(125));
        assert_eq!(bps_to_percentage(dec!(125)), dec!(1.25));
        assert_eq!(bps_to_percentage(percentage_to_bps(dec!(4.5))), dec!(4.5));
        assert_eq!(bps_to_rate(dec!(125)), dec!(0.0125));
    }

    #[test]
    fn test_percentage_rate_conversions() {
        assert_eq!(percentage_to_rate(dec!(5)), dec!(0.05));
        assert_eq!(rate_to_percentage(dec!(0.045)), dec!(4.5));
    }

    #[test]
    fn test_with_metadata_envelope() {
        let out = with_metadata("Test", &serde_json::json!({"k": 1}), vec![], 7, dec!(1));
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        assert_eq!(out.metadata.computation_time_us, 7);
        assert_eq!(out.assumptions["k"], 1);
    }
}

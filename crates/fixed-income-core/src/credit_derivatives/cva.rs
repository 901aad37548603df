use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FixedIncomeError;
use crate::fixed_income::spreads::DefaultProbabilityCurve;
use crate::math::{exp_decimal, pow_decimal};
use crate::types::{
    percentage_to_rate, with_metadata, Bps, ComputationOutput, Money, Percent, Rate, Years,
    BPS_PER_UNIT,
};
use crate::FixedIncomeResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposurePoint {
    pub time_years: Years,
    /// Expected positive exposure (EPE)
    pub expected_exposure: Money,
    /// Expected negative exposure, as a positive amount, for DVA. EPE is
    /// used in its place when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_negative_exposure: Option<Money>,
}

/// Where a party's default probabilities come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DefaultModel {
    /// Constant hazard rate per year: `S(t) = exp(-lambda t)`
    FlatHazard { hazard_rate: Rate },
    /// Cumulative default term structure, linearly interpolated
    Curve { curve: DefaultProbabilityCurve },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditParty {
    pub default_model: DefaultModel,
    pub recovery_rate: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvaInput {
    pub trade_description: String,
    /// Time-bucketed exposure profile, strictly increasing in time
    pub expected_exposure_profile: Vec<ExposurePoint>,
    pub counterparty: CreditParty,
    /// Own credit, for DVA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_credit: Option<CreditParty>,
    /// Annually compounded risk-free rate, in percent
    pub risk_free_rate: Percent,
    /// Fractional exposure reduction from netting (0.30 = 30%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netting_benefit: Option<Rate>,
    /// Exposure above the threshold is collateralised away
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral_threshold: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustedExposure {
    pub time_years: Years,
    pub gross_exposure: Money,
    pub net_exposure: Money,
    /// Exposure left after netting and collateral
    pub collateralised_exposure: Money,
    pub marginal_default_probability: Rate,
    pub discount_factor: Decimal,
    pub cva_contribution: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvaOutput {
    pub trade_description: String,
    pub unilateral_cva: Money,
    /// Zero without own credit
    pub dva: Money,
    /// CVA - DVA
    pub bilateral_cva: Money,
    /// CVA as a running spread over the discounted exposure annuity
    pub cva_as_spread_bps: Bps,
    /// Peak adjusted exposure
    pub peak_exposure: Money,
    /// Discounted-exposure-weighted time
    pub effective_maturity: Years,
    /// Share of gross exposure removed by netting and collateral
    pub exposure_reduction_pct: Rate,
    pub counterparty_lgd: Rate,
    pub adjusted_exposure_profile: Vec<AdjustedExposure>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Credit and debit valuation adjustments for a bilateral exposure profile.
///
/// `CVA = LGD_c * sum EPE(t_i) * D(t_i) * (S_c(t_{i-1}) - S_c(t_i))`, and DVA
/// mirrors it on the negative exposure with the reporting party's own
/// default probabilities.
pub fn calculate_cva(input: &CvaInput) -> FixedIncomeResult<ComputationOutput<CvaOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate_cva_input(input)?;

    let netting = input.netting_benefit.unwrap_or(Decimal::ZERO);
    let c_lgd = Decimal::ONE - input.counterparty.recovery_rate;
    let growth = Decimal::ONE + percentage_to_rate(input.risk_free_rate);

    let mut profile: Vec<AdjustedExposure> = Vec::with_capacity(input.expected_exposure_profile.len());
    let mut unilateral_cva = Decimal::ZERO;
    let mut dva = Decimal::ZERO;
    let mut total_gross = Decimal::ZERO;
    let mut total_adjusted = Decimal::ZERO;
    let mut discounted_exposure = Decimal::ZERO;
    let mut time_weighted_exposure = Decimal::ZERO;
    let mut annuity_exposure = Decimal::ZERO;
    let mut peak_exposure = Decimal::ZERO;

    let mut prev_time = Decimal::ZERO;
    let mut prev_c_survival = Decimal::ONE;
    let mut prev_o_survival = Decimal::ONE;

    for point in &input.expected_exposure_profile {
        let t = point.time_years;
        let gross = point.expected_exposure;
        let net = reduce_exposure(gross, netting, input.collateral_threshold);
        let net_before_collateral = gross * (Decimal::ONE - netting);

        let df = pow_decimal(growth, -t)?;
        let c_survival = survival(&input.counterparty.default_model, t)?;
        let marginal = (prev_c_survival - c_survival).max(Decimal::ZERO);
        let contribution = c_lgd * marginal * df * net;
        unilateral_cva += contribution;

        if let Some(own) = &input.own_credit {
            let o_survival = survival(&own.default_model, t)?;
            let negative = point.expected_negative_exposure.unwrap_or(gross);
            let own_net = reduce_exposure(negative, netting, input.collateral_threshold);
            let own_marginal = (prev_o_survival - o_survival).max(Decimal::ZERO);
            dva += (Decimal::ONE - own.recovery_rate) * own_marginal * df * own_net;
            prev_o_survival = o_survival;
        }

        total_gross += gross;
        total_adjusted += net;
        discounted_exposure += net * df;
        time_weighted_exposure += t * net * df;
        annuity_exposure += (t - prev_time) * c_survival * df * net;
        peak_exposure = peak_exposure.max(net);

        profile.push(AdjustedExposure {
            time_years: t,
            gross_exposure: gross,
            net_exposure: net_before_collateral,
            collateralised_exposure: net,
            marginal_default_probability: marginal,
            discount_factor: df,
            cva_contribution: contribution,
        });

        prev_time = t;
        prev_c_survival = c_survival;
    }

    if input.own_credit.is_some()
        && input
            .expected_exposure_profile
            .iter()
            .any(|p| p.expected_negative_exposure.is_none())
    {
        warnings.push("Expected negative exposure missing; EPE used as a proxy for DVA".into());
    }

    let effective_maturity = if discounted_exposure.is_zero() {
        Decimal::ZERO
    } else {
        time_weighted_exposure / discounted_exposure
    };
    let cva_as_spread_bps = if annuity_exposure.is_zero() {
        Decimal::ZERO
    } else {
        unilateral_cva / annuity_exposure * BPS_PER_UNIT
    };
    let exposure_reduction_pct = if total_gross.is_zero() {
        Decimal::ZERO
    } else {
        (total_gross - total_adjusted) / total_gross
    };

    let output = CvaOutput {
        trade_description: input.trade_description.clone(),
        unilateral_cva,
        dva,
        bilateral_cva: unilateral_cva - dva,
        cva_as_spread_bps,
        peak_exposure,
        effective_maturity,
        exposure_reduction_pct,
        counterparty_lgd: c_lgd,
        adjusted_exposure_profile: profile,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "discounting": "annual compounding at the risk-free rate",
        "netting_benefit": netting.to_string(),
        "collateral_threshold": input.collateral_threshold.map(|c| c.to_string()),
        "dva": input.own_credit.is_some(),
    });

    Ok(with_metadata(
        "CVA / DVA (discrete marginal default)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// Survival probability to `t` under a default model.
pub fn survival(model: &DefaultModel, t: Years) -> FixedIncomeResult<Rate> {
    match model {
        DefaultModel::FlatHazard { hazard_rate } => exp_decimal(-*hazard_rate * t),
        DefaultModel::Curve { curve } => Ok(curve.survival_at(t)),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn reduce_exposure(exposure: Money, netting: Rate, threshold: Option<Money>) -> Money {
    let net = exposure * (Decimal::ONE - netting);
    match threshold {
        Some(threshold) => (net - threshold).max(Decimal::ZERO),
        None => net,
    }
}

fn validate_party(party: &CreditParty, prefix: &str) -> FixedIncomeResult<()> {
    if party.recovery_rate < Decimal::ZERO || party.recovery_rate > Decimal::ONE {
        return Err(FixedIncomeError::invalid_input(
            &format!("{prefix}.recovery_rate"),
            "Recovery rate must be in [0, 1]",
        ));
    }
    match &party.default_model {
        DefaultModel::FlatHazard { hazard_rate } if *hazard_rate < Decimal::ZERO => {
            Err(FixedIncomeError::invalid_input(
                &format!("{prefix}.hazard_rate"),
                "Hazard rate cannot be negative",
            ))
        }
        DefaultModel::Curve { curve } if curve.tenors().is_empty() => {
            Err(FixedIncomeError::InsufficientData(format!(
                "{prefix} default curve has no tenors"
            )))
        }
        _ => Ok(()),
    }
}

fn validate_cva_input(input: &CvaInput) -> FixedIncomeResult<()> {
    if input.expected_exposure_profile.is_empty() {
        return Err(FixedIncomeError::InsufficientData(
            "At least one exposure point is required".into(),
        ));
    }
    validate_party(&input.counterparty, "counterparty")?;
    if let Some(own) = &input.own_credit {
        validate_party(own, "own_credit")?;
    }
    if input.risk_free_rate <= dec!(-100) {
        return Err(FixedIncomeError::invalid_input(
            "risk_free_rate",
            "Risk-free rate must exceed -100%",
        ));
    }
    if let Some(nb) = input.netting_benefit {
        if nb < Decimal::ZERO || nb > Decimal::ONE {
            return Err(FixedIncomeError::invalid_input(
                "netting_benefit",
                "Netting benefit must be in [0, 1]",
            ));
        }
    }
    if let Some(threshold) = input.collateral_threshold {
        if threshold < Decimal::ZERO {
            return Err(FixedIncomeError::invalid_input(
                "collateral_threshold",
                "Collateral threshold cannot be negative",
            ));
        }
    }

    let mut prev = Decimal::ZERO;
    for (i, ep) in input.expected_exposure_profile.iter().enumerate() {
        if ep.time_years <= prev {
            return Err(FixedIncomeError::invalid_input(
                &format!("expected_exposure_profile[{i}].time_years"),
                "Exposure times must be positive and strictly increasing",
            ));
        }
        if ep.expected_exposure < Decimal::ZERO
            || ep.expected_negative_exposure.is_some_and(|e| e < Decimal::ZERO)
        {
            return Err(FixedIncomeError::invalid_input(
                &format!("expected_exposure_profile[{i}]"),
                "Exposures must be non-negative",
            ));
        }
        prev = ep.time_years;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

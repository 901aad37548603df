use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FixedIncomeError;
use crate::fixed_income::spreads::DefaultProbabilityCurve;
use crate::types::{with_metadata, ComputationOutput, Rate, Years};
use crate::FixedIncomeResult;

const ROW_SUM_TOLERANCE: Decimal = dec!(0.001);
const MONOTONE_TOLERANCE: Decimal = dec!(0.0001);
const MAX_HORIZON_YEARS: u32 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One-period rating transition matrix. The last rating is the absorbing
/// default state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    /// Rating labels, best first, e.g. ["AAA", "AA", ..., "D"]
    pub ratings: Vec<String>,
    /// Row i = from rating[i], column j = to rating[j]
    pub probabilities: Vec<Vec<Rate>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationInput {
    pub transition_matrix: TransitionMatrix,
    pub time_horizon_years: u32,
    /// Ratings to report; every non-default rating when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingProbability {
    pub rating: String,
    pub probability: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingMigration {
    pub rating: String,
    pub upgrade_probability: Rate,
    /// Includes migration into default
    pub downgrade_probability: Rate,
    pub default_probability: Rate,
    pub stable_probability: Rate,
    /// Rating distribution at the horizon
    pub distribution: Vec<RatingProbability>,
    /// Cumulative default probability at each year up to the horizon
    pub default_curve: DefaultProbabilityCurve,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOutput {
    pub time_horizon_years: u32,
    pub results: Vec<RatingMigration>,
    /// Transition matrix over the full horizon
    pub horizon_matrix: TransitionMatrix,
    /// Default probability never falls as the rating worsens
    pub is_monotone: bool,
    /// max |row sum - 1| of the one-period matrix
    pub max_row_deviation: Decimal,
}

// ---------------------------------------------------------------------------
// Transition matrix
// ---------------------------------------------------------------------------

impl TransitionMatrix {
    /// Build and validate a transition matrix.
    pub fn new(ratings: Vec<String>, probabilities: Vec<Vec<Rate>>) -> FixedIncomeResult<Self> {
        let matrix = TransitionMatrix {
            ratings,
            probabilities,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Square, non-negative, rows summing to one within 0.001, and an
    /// absorbing final default state.
    pub fn validate(&self) -> FixedIncomeResult<()> {
        let n = self.ratings.len();
        if n < 2 {
            return Err(FixedIncomeError::InsufficientData(
                "A transition matrix needs at least one rating plus default".into(),
            ));
        }
        if self.probabilities.len() != n {
            return Err(FixedIncomeError::invalid_input(
                "probabilities",
                format!("Matrix has {} rows but {n} ratings", self.probabilities.len()),
            ));
        }
        for (i, row) in self.probabilities.iter().enumerate() {
            let rating = &self.ratings[i];
            if row.len() != n {
                return Err(FixedIncomeError::invalid_input(
                    &format!("probabilities[{i}]"),
                    format!("Row '{rating}' has {} columns but {n} ratings", row.len()),
                ));
            }
            if row.iter().any(|p| *p < Decimal::ZERO) {
                return Err(FixedIncomeError::invalid_input(
                    &format!("probabilities[{i}]"),
                    format!("Row '{rating}' has a negative probability"),
                ));
            }
            let sum: Decimal = row.iter().copied().sum();
            if (sum - Decimal::ONE).abs() > ROW_SUM_TOLERANCE {
                return Err(FixedIncomeError::invalid_input(
                    &format!("probabilities[{i}]"),
                    format!("Row '{rating}' sums to {sum}"),
                ));
            }
        }

        let d = self.default_index();
        if (self.probabilities[d][d] - Decimal::ONE).abs() > ROW_SUM_TOLERANCE {
            return Err(FixedIncomeError::invalid_input(
                "probabilities",
                format!("Default state '{}' is not absorbing", self.ratings[d]),
            ));
        }
        Ok(())
    }

    pub fn default_index(&self) -> usize {
        self.ratings.len().saturating_sub(1)
    }

    pub fn index_of(&self, rating: &str) -> FixedIncomeResult<usize> {
        self.ratings
            .iter()
            .position(|r| r == rating)
            .ok_or_else(|| {
                FixedIncomeError::invalid_input(
                    "rating",
                    format!("Rating '{rating}' is not in the transition matrix"),
                )
            })
    }

    /// The `periods`-step transition matrix by repeated squaring.
    pub fn multi_period_matrix(&self, periods: u32) -> FixedIncomeResult<TransitionMatrix> {
        self.validate()?;
        if periods > MAX_HORIZON_YEARS {
            return Err(FixedIncomeError::invalid_input(
                "periods",
                format!("At most {MAX_HORIZON_YEARS} periods are supported"),
            ));
        }
        Ok(TransitionMatrix {
            ratings: self.ratings.clone(),
            probabilities: matrix_power(&self.probabilities, periods)?,
        })
    }

    /// Cumulative default probability from `rating` at each year 1..=horizon.
    pub fn cumulative_default_curve(
        &self,
        rating: &str,
        horizon_years: u32,
    ) -> FixedIncomeResult<DefaultProbabilityCurve> {
        self.validate()?;
        validate_horizon(horizon_years, "horizon_years")?;
        let row = self.index_of(rating)?;
        let d = self.default_index();

        let mut tenors: Vec<Years> = Vec::with_capacity(horizon_years as usize);
        let mut cumulative: Vec<Rate> = Vec::with_capacity(horizon_years as usize);
        let mut power = self.probabilities.clone();
        for year in 1..=horizon_years {
            if year > 1 {
                power = matrix_multiply(&power, &self.probabilities)?;
            }
            tenors.push(Decimal::from(year));
            cumulative.push(power[row][d]);
        }
        DefaultProbabilityCurve::from_cumulative(tenors, cumulative)
    }

    fn is_monotone(&self) -> bool {
        let d = self.default_index();
        self.probabilities[..d]
            .windows(2)
            .all(|w| w[1][d] >= w[0][d] - MONOTONE_TOLERANCE)
    }

    fn max_row_deviation(&self) -> Decimal {
        self.probabilities
            .iter()
            .map(|row| (row.iter().copied().sum::<Decimal>() - Decimal::ONE).abs())
            .max()
            .unwrap_or(Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Upgrade, downgrade and default probabilities per rating over a horizon,
/// with each rating's cumulative default term structure.
pub fn calculate_migration(
    input: &MigrationInput,
) -> FixedIncomeResult<ComputationOutput<MigrationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let matrix = &input.transition_matrix;
    matrix.validate()?;
    validate_horizon(input.time_horizon_years, "time_horizon_years")?;

    let d = matrix.default_index();
    let requested: Vec<String> = match &input.ratings {
        Some(r) => r.clone(),
        None => matrix.ratings[..d].to_vec(),
    };

    let is_monotone = matrix.is_monotone();
    if !is_monotone {
        warnings.push(
            "Transition matrix is not monotone: a worse rating has a lower default probability"
                .into(),
        );
    }

    let horizon = matrix.multi_period_matrix(input.time_horizon_years)?;
    let results = requested
        .iter()
        .map(|rating| -> FixedIncomeResult<RatingMigration> {
            let i = matrix.index_of(rating)?;
            let row = &horizon.probabilities[i];
            let upgrade: Decimal = row[..i].iter().copied().sum();
            let downgrade: Decimal = row[i + 1..].iter().copied().sum();
            Ok(RatingMigration {
                rating: rating.clone(),
                upgrade_probability: upgrade,
                downgrade_probability: downgrade,
                default_probability: row[d],
                stable_probability: row[i],
                distribution: matrix
                    .ratings
                    .iter()
                    .zip(row)
                    .map(|(r, p)| RatingProbability {
                        rating: r.clone(),
                        probability: *p,
                    })
                    .collect(),
                default_curve: matrix.cumulative_default_curve(rating, input.time_horizon_years)?,
            })
        })
        .collect::<FixedIncomeResult<Vec<_>>>()?;

    let output = MigrationOutput {
        time_horizon_years: input.time_horizon_years,
        results,
        horizon_matrix: horizon,
        is_monotone,
        max_row_deviation: matrix.max_row_deviation(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "model": "time-homogeneous Markov chain",
        "time_horizon_years": input.time_horizon_years,
        "absorbing_state": matrix.ratings[d],
    });

    Ok(with_metadata(
        "Rating migration / Markov chain",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Matrix operations
// ---------------------------------------------------------------------------

fn validate_horizon(years: u32, field: &str) -> FixedIncomeResult<()> {
    if years == 0 || years > MAX_HORIZON_YEARS {
        return Err(FixedIncomeError::invalid_input(
            field,
            format!("Horizon must be between 1 and {MAX_HORIZON_YEARS} years"),
        ));
    }
    Ok(())
}

fn matrix_multiply(
    a: &[Vec<Decimal>],
    b: &[Vec<Decimal>],
) -> FixedIncomeResult<Vec<Vec<Decimal>>> {
    let n = b.len();
    a.iter()
        .map(|row| {
            (0..n)
                .map(|j| {
                    row.iter().zip(b).try_fold(Decimal::ZERO, |acc, (x, b_row)| {
                        x.checked_mul(b_row[j]).and_then(|term| acc.checked_add(term))
                    })
                })
                .collect::<Option<Vec<_>>>()
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            FixedIncomeError::FinancialImpossibility("Transition matrix power overflowed".into())
        })
}

fn identity(n: usize) -> Vec<Vec<Decimal>> {
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| if i == j { Decimal::ONE } else { Decimal::ZERO })
                .collect()
        })
        .collect()
}

fn matrix_power(m: &[Vec<Decimal>], exp: u32) -> FixedIncomeResult<Vec<Vec<Decimal>>> {
    let mut result = identity(m.len());
    let mut base = m.to_vec();
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = matrix_multiply(&result, &base)?;
        }
        e >>= 1;
        if e > 0 {
            base = matrix_multiply(&base, &base)?;
        }
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

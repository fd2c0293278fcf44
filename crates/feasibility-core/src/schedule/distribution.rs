use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FeasibilityError;
use crate::types::{to_cents, with_metadata, ComputationOutput, Money, Month, Rate};
use crate::FeasibilityResult;

/// Half-width of the S-curve in standard deviations.
const S_CURVE_SIGMAS: Decimal = dec!(3);

/// How a lump amount is spread over its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionMethod {
    /// Entire amount in the start month
    Upfront,
    /// Equal share in every month of the span
    Linear,
    /// Cumulative-normal ramp up and down across the span
    SCurve,
}

/// A distributed amount laid over the project horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// One entry per project month, in cents
    pub series: Vec<Money>,
    /// Sum of the series; the escalated total rounded to cents
    pub total: Money,
    /// Input amount before escalation
    pub nominal: Money,
    /// True when part of the span fell past the horizon and was folded
    /// into the final month
    pub truncated: bool,
}

impl Distribution {
    /// Escalated total over nominal. One when the nominal amount is zero.
    pub fn escalation_factor(&self) -> Decimal {
        if self.nominal.is_zero() {
            Decimal::ONE
        } else {
            self.total / self.nominal
        }
    }
}

/// Spread `amount` over `[start_month, start_month + span)` of a horizon of
/// `duration` months.
///
/// Each month's share is inflated by `(1 + escalation_rate)^(month / 12)`.
/// Months past the horizon fold into the last month. The series is rounded to
/// cents and the rounding residual lands in the last non-zero month, so the
/// series sums to the escalated total exactly.
pub fn distribute(
    amount: Money,
    start_month: Month,
    span: u32,
    method: DistributionMethod,
    escalation_rate: Rate,
    duration: u32,
) -> FeasibilityResult<Distribution> {
    if span == 0 {
        return Err(FeasibilityError::config(
            "span",
            "Distribution span must be at least 1 month",
        ));
    }
    if duration == 0 {
        return Err(FeasibilityError::config(
            "duration",
            "Project duration must be at least 1 month",
        ));
    }
    if escalation_rate <= dec!(-1) {
        return Err(FeasibilityError::config(
            "escalation_rate",
            "Escalation must be greater than -100% per annum",
        ));
    }

    let weights = match method {
        DistributionMethod::Upfront => vec![Decimal::ONE],
        DistributionMethod::Linear => vec![Decimal::ONE / Decimal::from(span); span as usize],
        DistributionMethod::SCurve => s_curve_weights(span),
    };

    let last = (duration - 1) as usize;
    let mut raw = vec![Decimal::ZERO; duration as usize];
    let mut truncated = false;

    let overflow = || {
        FeasibilityError::config(
            "escalation_rate",
            format!("escalated amount overflows over {span} months from month {start_month}"),
        )
    };

    for (offset, weight) in weights.iter().enumerate() {
        let month = start_month as usize + offset;
        let factor = Month::try_from(month)
            .ok()
            .and_then(|m| escalation_factor(escalation_rate, m))
            .ok_or_else(overflow)?;
        let share = amount
            .checked_mul(*weight)
            .and_then(|v| v.checked_mul(factor))
            .ok_or_else(overflow)?;
        let target = if month > last {
            truncated = true;
            last
        } else {
            month
        };
        raw[target] = raw[target].checked_add(share).ok_or_else(overflow)?;
    }

    let sum = raw
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(overflow)?;
    let total = to_cents(sum);
    let series = settle_to_cents(&raw, total);

    Ok(Distribution {
        series,
        total,
        nominal: amount,
        truncated,
    })
}

/// Compound escalation `(1 + rate)^(month / 12)`. `None` on overflow.
pub fn escalation_factor(rate: Rate, month: Month) -> Option<Decimal> {
    if rate.is_zero() || month == 0 {
        return Some(Decimal::ONE);
    }
    let base = Decimal::ONE + rate;
    if month % 12 == 0 {
        base.checked_powi((month / 12) as i64)
    } else {
        base.checked_powd(Decimal::from(month) / dec!(12))
    }
}

/// Round each entry to cents and push the residual against `total` into the
/// last non-zero entry.
pub fn settle_to_cents(raw: &[Money], total: Money) -> Vec<Money> {
    let mut series: Vec<Money> = raw.iter().map(|v| to_cents(*v)).collect();
    let rounded_sum: Money = series.iter().copied().sum();
    let residual = total - rounded_sum;
    if !residual.is_zero() {
        let idx = raw
            .iter()
            .rposition(|v| !v.is_zero())
            .unwrap_or(series.len().saturating_sub(1));
        if let Some(slot) = series.get_mut(idx) {
            *slot += residual;
        }
    }
    series
}

/// Normalised cumulative-normal weights over `span` equal slices of
/// `[-3σ, +3σ]`.
fn s_curve_weights(span: u32) -> Vec<Decimal> {
    if span == 1 {
        return vec![Decimal::ONE];
    }
    let n = Decimal::from(span);
    let width = S_CURVE_SIGMAS * dec!(2);
    let cdf_at = |k: u32| norm_cdf(-S_CURVE_SIGMAS + width * Decimal::from(k) / n);

    let raw: Vec<Decimal> = (0..span).map(|k| cdf_at(k + 1) - cdf_at(k)).collect();
    let sum: Decimal = raw.iter().copied().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

/// Standard normal PDF: phi(x) = exp(-x^2/2) / sqrt(2*pi)
fn norm_pdf(x: Decimal) -> Decimal {
    let sqrt_two_pi = dec!(2.5066282746310002);
    (-(x * x) / dec!(2)).exp() / sqrt_two_pi
}

/// Standard normal CDF using Abramowitz & Stegun approximation.
/// For x < 0: Phi(x) = 1 - Phi(-x)
fn norm_cdf(x: Decimal) -> Decimal {
    let b1 = dec!(0.319381530);
    let b2 = dec!(-0.356563782);
    let b3 = dec!(1.781477937);
    let b4 = dec!(-1.821255978);
    let b5 = dec!(1.330274429);
    let p = dec!(0.2316419);

    let abs_x = x.abs();
    let t = Decimal::ONE / (Decimal::ONE + p * abs_x);
    let poly = t * (b1 + t * (b2 + t * (b3 + t * (b4 + t * b5))));
    let cdf_pos = Decimal::ONE - norm_pdf(abs_x) * poly;

    if x < Decimal::ZERO {
        Decimal::ONE - cdf_pos
    } else {
        cdf_pos
    }
}

// ---------------------------------------------------------------------------
// Standalone entry point
// ---------------------------------------------------------------------------

/// Input for distributing a single amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionInput {
    pub amount: Money,
    pub start_month: Month,
    pub span: u32,
    pub method: DistributionMethod,
    #[serde(default)]
    pub escalation_rate: Rate,
    /// Project horizon in months
    pub duration: u32,
}

pub fn distribute_amount(
    input: &DistributionInput,
) -> FeasibilityResult<ComputationOutput<Distribution>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let dist = distribute(
        input.amount,
        input.start_month,
        input.span,
        input.method,
        input.escalation_rate,
        input.duration,
    )?;
    if dist.truncated {
        warnings.push(format!(
            "Span ends after month {}; tail folded into the final month",
            input.duration - 1
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Temporal distribution (upfront / linear / cumulative-normal S-curve) with annual escalation",
        input,
        warnings,
        elapsed,
        dist,
    ))
}

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FeasibilityError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::FeasibilityResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;
const INITIAL_GUESS: Decimal = dec!(0.01);
const RATE_FLOOR: Decimal = dec!(-0.99);
const RATE_CEILING: Decimal = dec!(100);

/// Probe rates used to bracket a root when Newton-Raphson fails.
const BRACKET_PROBES: [Decimal; 14] = [
    dec!(-0.99),
    dec!(-0.9),
    dec!(-0.5),
    dec!(-0.2),
    dec!(-0.05),
    dec!(0),
    dec!(0.01),
    dec!(0.05),
    dec!(0.1),
    dec!(0.25),
    dec!(0.5),
    dec!(1),
    dec!(5),
    dec!(100),
];

/// Why an IRR could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrUndefinedReason {
    /// Fewer than two flows.
    TooFewFlows,
    /// All flows share one sign (or are zero), so no rate zeroes the NPV.
    NoSignChange,
    /// Neither Newton-Raphson nor bisection found a root.
    NoConvergence,
}

/// Result of an IRR search. Undefined is a distinct state, never 0%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IrrOutcome {
    Defined { rate: Rate },
    Undefined { reason: IrrUndefinedReason },
}

impl IrrOutcome {
    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrOutcome::Defined { rate } => Some(*rate),
            IrrOutcome::Undefined { .. } => None,
        }
    }

    /// Convert a monthly IRR into an effective annual rate.
    pub fn annualised(&self) -> IrrOutcome {
        match self {
            IrrOutcome::Defined { rate } => match annualise_monthly_rate(*rate) {
                Some(annual) => IrrOutcome::Defined { rate: annual },
                None => IrrOutcome::Undefined {
                    reason: IrrUndefinedReason::NoConvergence,
                },
            },
            undefined => *undefined,
        }
    }
}

/// Net Present Value of a series of cash flows, first flow undiscounted.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> FeasibilityResult<Money> {
    if rate <= dec!(-1) {
        return Err(FeasibilityError::config(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Some(Decimal::ONE);

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.and_then(|d| d.checked_mul(one_plus_r));
        }
        // An overflowing factor discounts the flow to nothing.
        let Some(d) = discount else { break };
        if d.is_zero() {
            return Err(FeasibilityError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / d;
    }

    Ok(result)
}

/// NPV of a monthly series discounted at `annual_rate / 12` per month.
pub fn monthly_npv(annual_rate: Rate, cash_flows: &[Money]) -> FeasibilityResult<Money> {
    npv(annual_rate / dec!(12), cash_flows)
}

/// Effective annual rate `(1 + m)^12 - 1` for a monthly rate `m`.
pub fn annualise_monthly_rate(monthly: Rate) -> Option<Rate> {
    compound(Decimal::ONE + monthly, 12).map(|f| f - Decimal::ONE)
}

fn compound(base: Decimal, periods: u32) -> Option<Decimal> {
    let mut acc = Decimal::ONE;
    for _ in 0..periods {
        acc = acc.checked_mul(base)?;
    }
    Some(acc)
}

/// Internal Rate of Return per period.
///
/// Newton-Raphson seeded at 1% per period, falling back to bisection over a
/// probed bracket when the derivative vanishes or the iteration wanders off.
pub fn irr(cash_flows: &[Money]) -> IrrOutcome {
    if cash_flows.len() < 2 {
        return IrrOutcome::Undefined {
            reason: IrrUndefinedReason::TooFewFlows,
        };
    }
    let has_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !(has_positive && has_negative) {
        return IrrOutcome::Undefined {
            reason: IrrUndefinedReason::NoSignChange,
        };
    }

    let found = newton_raphson(cash_flows, INITIAL_GUESS).or_else(|err| {
        tracing::debug!(%err, "newton-raphson failed, falling back to bisection");
        bisection(cash_flows)
    });

    match found {
        Ok(rate) => IrrOutcome::Defined { rate },
        Err(_) => IrrOutcome::Undefined {
            reason: IrrUndefinedReason::NoConvergence,
        },
    }
}

fn newton_raphson(cash_flows: &[Money], guess: Rate) -> FeasibilityResult<Rate> {
    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) =
            npv_and_derivative(cash_flows, rate).ok_or(FeasibilityError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: Decimal::ZERO,
            })?;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        if dnpv.is_zero() {
            return Err(FeasibilityError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: npv_val,
            });
        }

        rate -= npv_val / dnpv;

        // Guard against divergence
        if rate < RATE_FLOOR {
            rate = RATE_FLOOR;
        } else if rate > RATE_CEILING {
            rate = RATE_CEILING;
        }
    }

    Err(FeasibilityError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: npv_and_derivative(cash_flows, rate)
            .map(|(v, _)| v)
            .unwrap_or(Decimal::MAX),
    })
}

fn bisection(cash_flows: &[Money]) -> FeasibilityResult<Rate> {
    let values: Vec<(Rate, Decimal)> = BRACKET_PROBES
        .iter()
        .filter_map(|r| npv_and_derivative(cash_flows, *r).map(|(v, _)| (*r, v)))
        .collect();

    let bracket = values.windows(2).find_map(|w| {
        let (lo, f_lo) = w[0];
        let (hi, f_hi) = w[1];
        if f_lo.is_zero() {
            Some((lo, lo, f_lo))
        } else if (f_lo > Decimal::ZERO) != (f_hi > Decimal::ZERO) {
            Some((lo, hi, f_lo))
        } else {
            None
        }
    });

    let (mut lo, mut hi, mut f_lo) = bracket.ok_or_else(|| FeasibilityError::ConvergenceFailure {
        function: "IRR bisection".into(),
        iterations: 0,
        last_delta: Decimal::ZERO,
    })?;
    if lo == hi {
        return Ok(lo);
    }

    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let (f_mid, _) = npv_and_derivative(cash_flows, mid).ok_or_else(|| {
            FeasibilityError::ConvergenceFailure {
                function: "IRR bisection".into(),
                iterations: 0,
                last_delta: Decimal::ZERO,
            }
        })?;
        if f_mid.abs() < CONVERGENCE_THRESHOLD {
            return Ok(mid);
        }
        if (f_mid > Decimal::ZERO) == (f_lo > Decimal::ZERO) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(FeasibilityError::ConvergenceFailure {
        function: "IRR bisection".into(),
        iterations: MAX_BISECTION_ITERATIONS,
        last_delta: f_lo,
    })
}

/// NPV and dNPV/dr at `rate`. `None` when the discount factor collapses to
/// zero or a term overflows.
fn npv_and_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                // Remaining terms are negligible
                None => break,
            }
        }
        if discount.is_zero() {
            return None;
        }
        let term = cf.checked_div(discount)?;
        npv_val = npv_val.checked_add(term)?;
        if t > 0 {
            let t_dec = Decimal::from(t as u64);
            dnpv = dnpv.checked_sub(t_dec.checked_mul(term)?.checked_div(one_plus_r)?)?;
        }
    }

    Some((npv_val, dnpv))
}

// ---------------------------------------------------------------------------
// Standalone DCF calculation
// ---------------------------------------------------------------------------

/// Input for a standalone NPV / IRR calculation over a periodic series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    /// Net flow per period, period 0 first
    pub cash_flows: Vec<Money>,
    /// Annual discount rate (decimal)
    pub annual_discount_rate: Rate,
    /// Periods per year; 12 for monthly series
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
}

fn default_periods_per_year() -> u32 {
    12
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfOutput {
    pub npv: Money,
    /// IRR per period
    pub irr: IrrOutcome,
    /// IRR compounded to an effective annual rate
    pub irr_annualised: IrrOutcome,
}

/// NPV at `annual_discount_rate / periods_per_year` and the IRR of the series.
pub fn calculate_dcf(input: &DcfInput) -> FeasibilityResult<ComputationOutput<DcfOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    if input.periods_per_year == 0 {
        return Err(FeasibilityError::config(
            "periods_per_year",
            "must be at least 1",
        ));
    }
    if input.cash_flows.is_empty() {
        return Err(FeasibilityError::InsufficientData(
            "DCF requires at least one cash flow".into(),
        ));
    }

    let periodic_rate = input.annual_discount_rate / Decimal::from(input.periods_per_year);
    let npv_val = npv(periodic_rate, &input.cash_flows)?;
    let irr_val = irr(&input.cash_flows);
    let irr_annual = match irr_val {
        IrrOutcome::Defined { rate } => match compound(Decimal::ONE + rate, input.periods_per_year)
        {
            Some(f) => IrrOutcome::Defined {
                rate: f - Decimal::ONE,
            },
            None => IrrOutcome::Undefined {
                reason: IrrUndefinedReason::NoConvergence,
            },
        },
        undefined => undefined,
    };
    if let IrrOutcome::Undefined { reason } = irr_val {
        warnings.push(format!("IRR undefined: {reason:?}"));
    }

    let output = DcfOutput {
        npv: npv_val,
        irr: irr_val,
        irr_annualised: irr_annual,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Discounted cash flow (explicit discounting, Newton-Raphson IRR with bisection fallback)",
        &serde_json::json!({
            "periods": input.cash_flows.len(),
            "annual_discount_rate": input.annual_discount_rate.to_string(),
            "periods_per_year": input.periods_per_year,
        }),
        warnings,
        elapsed,
        output,
    ))
}

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FeasibilityError;
use crate::types::{Money, Month, Rate};
use crate::FeasibilityResult;

/// A rate effective from `month` until the next entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedRate {
    pub month: Month,
    pub rate: Rate,
}

/// Annual interest rate of a debt tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateMode {
    Single { rate: Rate },
    /// Entries strictly increasing by month
    Variable { schedule: Vec<DatedRate> },
}

impl RateMode {
    /// Annual rate in force for `month`: the latest entry at or before it.
    /// Months before the first entry take the first entry's rate.
    pub fn rate_for(&self, month: Month) -> Rate {
        match self {
            RateMode::Single { rate } => *rate,
            RateMode::Variable { schedule } => schedule
                .iter()
                .take_while(|r| r.month <= month)
                .last()
                .or_else(|| schedule.first())
                .map(|r| r.rate)
                .unwrap_or(Decimal::ZERO),
        }
    }

    pub fn validate(&self, field: &str) -> FeasibilityResult<()> {
        match self {
            RateMode::Single { rate } => validate_non_negative(&format!("{field}.rate"), *rate),
            RateMode::Variable { schedule } => {
                if schedule.is_empty() {
                    return Err(FeasibilityError::config(
                        format!("{field}.schedule"),
                        "variable rate schedule needs at least one entry",
                    ));
                }
                for (i, entry) in schedule.iter().enumerate() {
                    validate_non_negative(&format!("{field}.schedule[{i}].rate"), entry.rate)?;
                    if i > 0 && entry.month <= schedule[i - 1].month {
                        return Err(FeasibilityError::config(
                            format!("{field}.schedule[{i}].month"),
                            format!(
                                "months must be strictly increasing ({} follows {})",
                                entry.month,
                                schedule[i - 1].month
                            ),
                        ));
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TierKind {
    Senior,
    Mezzanine,
}

impl TierKind {
    pub fn index(self) -> usize {
        match self {
            TierKind::Senior => 0,
            TierKind::Mezzanine => 1,
        }
    }
}

/// A debt facility with every option resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalTier {
    pub kind: TierKind,
    pub name: String,
    pub rate: RateMode,
    /// Annual line fee on the facility limit
    pub line_fee_rate: Rate,
    /// One-off fee charged in the activation month
    pub establishment_fee: Money,
    /// Facility limit in currency
    pub limit: Money,
    /// First month the facility may be drawn
    pub activation_month: Month,
    /// Interest added to the balance instead of paid in cash
    pub interest_capitalised: bool,
}

impl CapitalTier {
    pub fn is_active(&self, month: Month) -> bool {
        month >= self.activation_month
    }

    /// Line fee for one month, on the full limit.
    pub fn monthly_line_fee(&self, month: Month) -> Money {
        if self.is_active(month) {
            self.limit * self.line_fee_rate / dec!(12)
        } else {
            Decimal::ZERO
        }
    }

    pub fn validate(&self) -> FeasibilityResult<()> {
        let field = format!("capital.{:?}", self.kind).to_lowercase();
        self.rate.validate(&field)?;
        validate_non_negative(&format!("{field}.line_fee_rate"), self.line_fee_rate)?;
        validate_non_negative(&format!("{field}.establishment_fee"), self.establishment_fee)?;
        validate_non_negative(&format!("{field}.limit"), self.limit)?;
        Ok(())
    }
}

/// Where the money for a draw comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FundingSource {
    Equity,
    Senior,
    Mezzanine,
}

impl FundingSource {
    pub fn tier(self) -> Option<TierKind> {
        match self {
            FundingSource::Equity => None,
            FundingSource::Senior => Some(TierKind::Senior),
            FundingSource::Mezzanine => Some(TierKind::Mezzanine),
        }
    }
}

pub fn default_funding_order() -> Vec<FundingSource> {
    vec![
        FundingSource::Equity,
        FundingSource::Senior,
        FundingSource::Mezzanine,
    ]
}

/// A fixed equity contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instalment {
    pub month: Month,
    pub amount: Money,
}

/// Resolved equity injection plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EquityPlan {
    /// Whole amount injected in month 0, then drawn down as needed
    LumpSum { amount: Money },
    /// Fixed amounts at fixed months regardless of need
    Instalments { schedule: Vec<Instalment> },
    /// A quantum fixed once from land or total cost, drawn as needed
    Pool { commitment: Money, basis: PoolBasis },
    /// Fixed share of every month's draw; debt funds the rest
    PariPassu { share: Rate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolBasis {
    PercentOfLand,
    PercentOfTotalCost,
}

impl EquityPlan {
    /// Cash injected in `month` independent of need.
    pub fn scheduled_injection(&self, month: Month) -> Money {
        match self {
            EquityPlan::LumpSum { amount } if month == 0 => *amount,
            EquityPlan::Instalments { schedule } => schedule
                .iter()
                .filter(|i| i.month == month)
                .map(|i| i.amount)
                .sum(),
            _ => Decimal::ZERO,
        }
    }

    pub fn validate(&self) -> FeasibilityResult<()> {
        match self {
            EquityPlan::LumpSum { amount } => validate_non_negative("equity.amount", *amount),
            EquityPlan::Instalments { schedule } => {
                for (i, inst) in schedule.iter().enumerate() {
                    validate_non_negative(&format!("equity.schedule[{i}].amount"), inst.amount)?;
                }
                Ok(())
            }
            EquityPlan::Pool { commitment, .. } => {
                validate_non_negative("equity.commitment", *commitment)
            }
            EquityPlan::PariPassu { share } => validate_fraction("equity.share", *share),
        }
    }
}

/// What happens to a month's net cash surplus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SurplusPolicy {
    /// Repay debt in reverse priority, distribute the rest to equity
    #[default]
    RepayDebt,
    /// Repay cash-pay tiers only; hold the rest at the surplus funds rate
    /// instead of repaying interest-capitalised tiers, sweeping at the end
    RetainCash,
}

/// The complete, resolved capital structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalStack {
    pub senior: Option<CapitalTier>,
    pub mezzanine: Option<CapitalTier>,
    pub equity: EquityPlan,
    pub funding_order: Vec<FundingSource>,
    pub surplus_policy: SurplusPolicy,
    /// Annual rate earned on cash held
    pub surplus_funds_rate: Rate,
}

impl CapitalStack {
    pub fn tier(&self, kind: TierKind) -> Option<&CapitalTier> {
        match kind {
            TierKind::Senior => self.senior.as_ref(),
            TierKind::Mezzanine => self.mezzanine.as_ref(),
        }
    }

    /// Configured debt tiers in draw priority.
    pub fn draw_order(&self) -> Vec<&CapitalTier> {
        self.funding_order
            .iter()
            .filter_map(|s| s.tier())
            .filter_map(|k| self.tier(k))
            .collect()
    }

    /// Configured debt tiers in repayment priority (reverse of draw).
    pub fn repay_order(&self) -> Vec<&CapitalTier> {
        let mut order = self.draw_order();
        order.reverse();
        order
    }

    pub fn validate(&self) -> FeasibilityResult<()> {
        for (i, source) in self.funding_order.iter().enumerate() {
            if self.funding_order[..i].contains(source) {
                return Err(FeasibilityError::config(
                    "capital.funding_order",
                    format!("{source:?} listed more than once"),
                ));
            }
        }
        for tier in [&self.senior, &self.mezzanine].into_iter().flatten() {
            tier.validate()?;
        }
        self.equity.validate()?;
        validate_non_negative("capital.surplus_funds_rate", self.surplus_funds_rate)
    }
}

pub(crate) fn validate_non_negative(field: &str, value: Decimal) -> FeasibilityResult<()> {
    if value < Decimal::ZERO {
        return Err(FeasibilityError::config(field, "must not be negative"));
    }
    Ok(())
}

pub(crate) fn validate_fraction(field: &str, value: Decimal) -> FeasibilityResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(FeasibilityError::config(
            field,
            format!("{value} is outside [0, 1]"),
        ));
    }
    Ok(())
}

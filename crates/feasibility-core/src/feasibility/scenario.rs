use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::capital::stack::{
    default_funding_order, validate_fraction, validate_non_negative, CapitalStack, CapitalTier,
    EquityPlan, FundingSource, Instalment, PoolBasis, RateMode, SurplusPolicy, TierKind,
};
use crate::error::FeasibilityError;
use crate::schedule::DistributionMethod;
use crate::tax::{GstTreatment, Jurisdiction, TaxKind, TaxTable};
use crate::types::{to_cents, Money, Month, Rate};
use crate::FeasibilityResult;

const DEFAULT_GST_RATE: Decimal = dec!(0.10);

// ---------------------------------------------------------------------------
// Input types (as supplied by the persistence layer)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CostCategory {
    Land,
    Statutory,
    Consultants,
    Construction,
    Miscellaneous,
    Selling,
    Finance,
}

impl CostCategory {
    pub const ALL: [CostCategory; 7] = [
        CostCategory::Land,
        CostCategory::Statutory,
        CostCategory::Consultants,
        CostCategory::Construction,
        CostCategory::Miscellaneous,
        CostCategory::Selling,
        CostCategory::Finance,
    ];
}

/// How a cost line's amount is obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CostInput {
    Fixed { amount: Money },
    /// Rate times the site's land area
    RatePerSqm { rate: Money },
    /// Share of the driver-free construction total
    PercentOfConstruction { pct: Rate },
    /// Share of gross realisation
    PercentOfRevenue { pct: Rate },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostItemInput {
    pub category: CostCategory,
    pub description: String,
    pub input: CostInput,
    pub start_month: Month,
    pub span: u32,
    pub method: DistributionMethod,
    /// Annual escalation (decimal)
    #[serde(default)]
    pub escalation_rate: Rate,
    #[serde(default)]
    pub gst: GstTreatment,
    /// Allows a negative amount
    #[serde(default)]
    pub is_credit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RevenueCalculation {
    QuantityRate { units: Decimal, rate: Money },
    LumpSum { amount: Money },
}

impl RevenueCalculation {
    pub fn gross(&self) -> Money {
        match self {
            RevenueCalculation::QuantityRate { units, rate } => *units * *rate,
            RevenueCalculation::LumpSum { amount } => *amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellTerms {
    /// Months after completion before settlements begin
    #[serde(default)]
    pub settlement_offset: Month,
    pub settlement_span: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldTerms {
    #[serde(default)]
    pub lease_up_months: u32,
    /// Vacancy allowance (decimal)
    #[serde(default)]
    pub vacancy: Rate,
    /// Operating expenses as a share of rent (decimal)
    #[serde(default)]
    pub opex: Rate,
    #[serde(default)]
    pub cap_rate: Rate,
    /// Value the asset at NOI / cap rate and realise it in the final month
    #[serde(default)]
    pub capitalised: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RevenueStrategy {
    Sell(SellTerms),
    Hold(HoldTerms),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueItemInput {
    pub description: String,
    pub strategy: RevenueStrategy,
    /// Gross sale price, or annual gross rent for a hold
    pub calculation: RevenueCalculation,
    #[serde(default)]
    pub commission_rate: Rate,
    #[serde(default)]
    pub gst: GstTreatment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsInput {
    pub duration_months: u32,
    #[serde(default)]
    pub construction_start: Month,
    pub construction_span: u32,
    /// Annual discount rate for NPV
    pub discount_rate: Rate,
    pub gst_rate: Option<Rate>,
    /// Calendar date of month 0, used to label periods
    pub start_date: Option<NaiveDate>,
    pub include_stamp_duty: Option<bool>,
    pub include_land_tax: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ownership {
    #[default]
    General,
    Trust,
}

impl Ownership {
    pub fn land_tax_kind(self) -> TaxKind {
        match self {
            Ownership::General => TaxKind::LandTaxGeneral,
            Ownership::Trust => TaxKind::LandTaxTrust,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteInput {
    pub name: String,
    pub jurisdiction: Jurisdiction,
    #[serde(default)]
    pub land_area_sqm: Decimal,
    /// Assessed land value for land tax; the land cost when absent
    pub land_value: Option<Money>,
    pub ownership: Option<Ownership>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeeBasis {
    PercentOfLimit(Rate),
    Fixed(Money),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LimitMethod {
    Fixed(Money),
    /// Share of total development cost
    Percentage(Rate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalTierInput {
    pub name: Option<String>,
    pub rate: RateMode,
    #[serde(default)]
    pub line_fee_rate: Rate,
    pub establishment_fee: Option<FeeBasis>,
    pub limit: LimitMethod,
    #[serde(default)]
    pub activation_month: Month,
    /// Defaults to capitalising
    pub interest_capitalised: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquityMode {
    LumpSum,
    Instalments,
    PercentOfLand,
    PercentOfTotalCost,
    PariPassu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityInput {
    pub mode: EquityMode,
    #[serde(default)]
    pub initial_contribution: Money,
    #[serde(default)]
    pub instalments: Vec<Instalment>,
    /// Required by the percentage and pari-passu modes
    pub percentage: Option<Rate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalInput {
    pub senior: Option<CapitalTierInput>,
    pub mezzanine: Option<CapitalTierInput>,
    pub equity: EquityInput,
    pub funding_order: Option<Vec<FundingSource>>,
    pub surplus_policy: Option<SurplusPolicy>,
    pub surplus_funds_rate: Option<Rate>,
}

/// A scenario exactly as stored. Resolve it before simulating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub name: String,
    pub settings: SettingsInput,
    pub site: SiteInput,
    #[serde(default)]
    pub costs: Vec<CostItemInput>,
    #[serde(default)]
    pub revenues: Vec<RevenueItemInput>,
    pub capital: CapitalInput,
    #[serde(default)]
    pub tax_table: TaxTable,
}

// ---------------------------------------------------------------------------
// Resolved types (consumed by the engine)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSettings {
    pub duration_months: u32,
    pub construction_start: Month,
    pub construction_span: u32,
    pub completion_month: Month,
    pub discount_rate: Rate,
    pub gst_rate: Rate,
    pub start_date: Option<NaiveDate>,
    pub include_stamp_duty: bool,
    pub include_land_tax: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSite {
    pub name: String,
    pub jurisdiction: Jurisdiction,
    pub land_area_sqm: Decimal,
    pub land_value: Money,
    pub ownership: Ownership,
}

/// Where a cost line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineOrigin {
    Input { index: usize },
    StampDuty,
    LandTax { year: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub origin: LineOrigin,
    pub category: CostCategory,
    pub description: String,
    /// Nominal amount before escalation
    pub amount: Money,
    pub start_month: Month,
    pub span: u32,
    pub method: DistributionMethod,
    pub escalation_rate: Rate,
    pub gst: GstTreatment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RevenueTiming {
    Sale {
        gross: Money,
        start_month: Month,
        span: u32,
    },
    Hold {
        /// Annual net operating income
        annual_noi: Money,
        income_start: Month,
        cap_rate: Rate,
        /// NOI / cap rate, realised in the final month
        capitalised_value: Option<Money>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueLine {
    pub index: usize,
    pub description: String,
    pub timing: RevenueTiming,
    pub commission_rate: Rate,
    pub gst: GstTreatment,
    /// Acquisition cost basis for margin-scheme GST
    pub margin_basis: Money,
}

impl RevenueLine {
    /// Amount the line realises as a sale (sale price or capitalised value).
    pub fn realisation(&self) -> Money {
        match &self.timing {
            RevenueTiming::Sale { gross, .. } => *gross,
            RevenueTiming::Hold {
                capitalised_value, ..
            } => capitalised_value.unwrap_or(Decimal::ZERO),
        }
    }
}

/// A fully populated, validated scenario. The engine applies no defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedScenario {
    pub name: String,
    pub settings: ResolvedSettings,
    pub site: ResolvedSite,
    pub costs: Vec<CostLine>,
    pub revenues: Vec<RevenueLine>,
    pub capital: CapitalStack,
    pub tax_table: TaxTable,
    /// Stamp duty resolved on the land cost
    pub stamp_duty: Money,
    /// Land tax per charge year
    pub annual_land_tax: Money,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Value an income stream at `noi / cap_rate`; zero for a zero cap rate.
pub fn capitalised_value(annual_noi: Money, cap_rate: Rate) -> Money {
    if cap_rate.is_zero() {
        Decimal::ZERO
    } else {
        to_cents(annual_noi / cap_rate)
    }
}

/// Validate a stored scenario and fill in every default exactly once.
pub fn resolve_scenario(input: &ScenarioInput) -> FeasibilityResult<ResolvedScenario> {
    let settings = resolve_settings(&input.settings)?;

    if input.site.land_area_sqm < Decimal::ZERO {
        return Err(FeasibilityError::config(
            "site.land_area_sqm",
            "must not be negative",
        ));
    }

    for (i, item) in input.costs.iter().enumerate() {
        validate_cost_item(i, item)?;
    }

    let land_nominal: Money = input
        .costs
        .iter()
        .filter(|c| c.category == CostCategory::Land)
        .filter_map(|c| direct_amount(&c.input, input.site.land_area_sqm))
        .sum();

    let revenues = resolve_revenues(&input.revenues, &settings, land_nominal)?;
    let gross_realisation: Money = revenues.iter().map(RevenueLine::realisation).sum();
    let mut costs = resolve_costs(&input.costs, input.site.land_area_sqm, gross_realisation);

    let site = ResolvedSite {
        name: input.site.name.clone(),
        jurisdiction: input.site.jurisdiction.clone(),
        land_area_sqm: input.site.land_area_sqm,
        land_value: input.site.land_value.unwrap_or(land_nominal),
        ownership: input.site.ownership.unwrap_or_default(),
    };

    let stamp_duty = if settings.include_stamp_duty && !land_nominal.is_zero() {
        input
            .tax_table
            .resolve(&site.jurisdiction, TaxKind::StampDuty, land_nominal)
    } else {
        Decimal::ZERO
    };
    if stamp_duty > Decimal::ZERO {
        let month = input
            .costs
            .iter()
            .filter(|c| c.category == CostCategory::Land)
            .map(|c| c.start_month)
            .min()
            .unwrap_or(0);
        costs.push(statutory_line(LineOrigin::StampDuty, "Stamp Duty", stamp_duty, month));
    }

    let annual_land_tax = if settings.include_land_tax {
        input.tax_table.resolve(
            &site.jurisdiction,
            site.ownership.land_tax_kind(),
            site.land_value,
        )
    } else {
        Decimal::ZERO
    };
    if annual_land_tax > Decimal::ZERO {
        for year in 0..settings.duration_months.div_ceil(12) {
            costs.push(statutory_line(
                LineOrigin::LandTax { year },
                &format!("Land Tax (year {})", year + 1),
                annual_land_tax,
                year * 12,
            ));
        }
    }

    let total_cost: Money = costs
        .iter()
        .filter(|c| c.category != CostCategory::Finance)
        .map(|c| c.amount)
        .sum();
    let capital = resolve_capital(&input.capital, land_nominal, total_cost)?;

    Ok(ResolvedScenario {
        name: input.name.clone(),
        settings,
        site,
        costs,
        revenues,
        capital,
        tax_table: input.tax_table.clone(),
        stamp_duty,
        annual_land_tax,
    })
}

fn resolve_settings(s: &SettingsInput) -> FeasibilityResult<ResolvedSettings> {
    if s.duration_months == 0 {
        return Err(FeasibilityError::config(
            "settings.duration_months",
            "Project duration must be at least 1 month",
        ));
    }
    if s.construction_span == 0 {
        return Err(FeasibilityError::config(
            "settings.construction_span",
            "Construction span must be at least 1 month",
        ));
    }
    let completion_month = s
        .construction_start
        .checked_add(s.construction_span)
        .ok_or_else(|| {
            FeasibilityError::config(
                "settings.construction_span",
                "construction start plus span is out of range",
            )
        })?;
    if completion_month > s.duration_months {
        return Err(FeasibilityError::config(
            "settings.construction_span",
            format!(
                "construction completes in month {completion_month}, after the {}-month horizon",
                s.duration_months
            ),
        ));
    }
    if s.discount_rate <= dec!(-1) {
        return Err(FeasibilityError::config(
            "settings.discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }
    let gst_rate = s.gst_rate.unwrap_or(DEFAULT_GST_RATE);
    validate_non_negative("settings.gst_rate", gst_rate)?;

    Ok(ResolvedSettings {
        duration_months: s.duration_months,
        construction_start: s.construction_start,
        construction_span: s.construction_span,
        completion_month,
        discount_rate: s.discount_rate,
        gst_rate,
        start_date: s.start_date,
        include_stamp_duty: s.include_stamp_duty.unwrap_or(true),
        include_land_tax: s.include_land_tax.unwrap_or(true),
    })
}

fn validate_cost_item(i: usize, item: &CostItemInput) -> FeasibilityResult<()> {
    let field = |name: &str| format!("costs[{i}].{name}");
    if item.span == 0 {
        return Err(FeasibilityError::config(
            field("span"),
            "Distribution span must be at least 1 month",
        ));
    }
    if item.escalation_rate <= dec!(-1) {
        return Err(FeasibilityError::config(
            field("escalation_rate"),
            "Escalation must be greater than -100% per annum",
        ));
    }
    match &item.input {
        CostInput::Fixed { amount } if !item.is_credit => {
            validate_non_negative(&field("amount"), *amount)
        }
        CostInput::RatePerSqm { rate } if !item.is_credit => {
            validate_non_negative(&field("rate"), *rate)
        }
        CostInput::PercentOfConstruction { pct } | CostInput::PercentOfRevenue { pct } => {
            validate_fraction(&field("pct"), *pct)
        }
        _ => Ok(()),
    }
}

/// Amount of a line that does not depend on other lines.
fn direct_amount(input: &CostInput, land_area: Decimal) -> Option<Money> {
    match input {
        CostInput::Fixed { amount } => Some(*amount),
        CostInput::RatePerSqm { rate } => Some(to_cents(*rate * land_area)),
        CostInput::PercentOfConstruction { .. } | CostInput::PercentOfRevenue { .. } => None,
    }
}

fn resolve_costs(items: &[CostItemInput], land_area: Decimal, gross_realisation: Money) -> Vec<CostLine> {
    let construction_base: Money = items
        .iter()
        .filter(|c| c.category == CostCategory::Construction)
        .filter_map(|c| direct_amount(&c.input, land_area))
        .sum();

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let amount = match &item.input {
                CostInput::PercentOfConstruction { pct } => to_cents(construction_base * *pct),
                CostInput::PercentOfRevenue { pct } => to_cents(gross_realisation * *pct),
                direct => direct_amount(direct, land_area).unwrap_or(Decimal::ZERO),
            };
            CostLine {
                origin: LineOrigin::Input { index },
                category: item.category,
                description: item.description.clone(),
                amount,
                start_month: item.start_month,
                span: item.span,
                method: item.method,
                escalation_rate: item.escalation_rate,
                gst: item.gst,
            }
        })
        .collect()
}

fn statutory_line(origin: LineOrigin, description: &str, amount: Money, month: Month) -> CostLine {
    CostLine {
        origin,
        category: CostCategory::Statutory,
        description: description.to_string(),
        amount,
        start_month: month,
        span: 1,
        method: DistributionMethod::Upfront,
        escalation_rate: Decimal::ZERO,
        gst: GstTreatment::GstFree,
    }
}

fn resolve_revenues(
    items: &[RevenueItemInput],
    settings: &ResolvedSettings,
    land_nominal: Money,
) -> FeasibilityResult<Vec<RevenueLine>> {
    let mut lines = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let field = |name: &str| format!("revenues[{index}].{name}");
        let after_completion = |months: u32, name: &str| {
            settings
                .completion_month
                .checked_add(months)
                .ok_or_else(|| FeasibilityError::config(field(name), "month is out of range"))
        };
        if let RevenueCalculation::QuantityRate { units, rate } = &item.calculation {
            validate_non_negative(&field("units"), *units)?;
            validate_non_negative(&field("rate"), *rate)?;
        }
        let gross = to_cents(item.calculation.gross());
        validate_non_negative(&field("gross"), gross)?;
        validate_fraction(&field("commission_rate"), item.commission_rate)?;

        let timing = match &item.strategy {
            RevenueStrategy::Sell(terms) => {
                if terms.settlement_span == 0 {
                    return Err(FeasibilityError::config(
                        field("settlement_span"),
                        "Settlement span must be at least 1 month",
                    ));
                }
                RevenueTiming::Sale {
                    gross,
                    start_month: after_completion(terms.settlement_offset, "settlement_offset")?,
                    span: terms.settlement_span,
                }
            }
            RevenueStrategy::Hold(terms) => {
                validate_fraction(&field("vacancy"), terms.vacancy)?;
                validate_fraction(&field("opex"), terms.opex)?;
                validate_non_negative(&field("cap_rate"), terms.cap_rate)?;
                if terms.capitalised && terms.cap_rate.is_zero() {
                    return Err(FeasibilityError::config(
                        field("cap_rate"),
                        "Cap rate must be positive for a capitalised hold",
                    ));
                }
                let annual_noi =
                    to_cents(gross * (Decimal::ONE - terms.vacancy) * (Decimal::ONE - terms.opex));
                RevenueTiming::Hold {
                    annual_noi,
                    income_start: after_completion(terms.lease_up_months, "lease_up_months")?,
                    cap_rate: terms.cap_rate,
                    capitalised_value: terms
                        .capitalised
                        .then(|| capitalised_value(annual_noi, terms.cap_rate)),
                }
            }
        };

        lines.push(RevenueLine {
            index,
            description: item.description.clone(),
            timing,
            commission_rate: item.commission_rate,
            gst: item.gst,
            margin_basis: Decimal::ZERO,
        });
    }

    // Apportion the land cost across margin-scheme sales by realisation
    let margin_total: Money = lines
        .iter()
        .filter(|l| l.gst == GstTreatment::MarginScheme)
        .map(RevenueLine::realisation)
        .sum();
    if !margin_total.is_zero() {
        for line in lines.iter_mut().filter(|l| l.gst == GstTreatment::MarginScheme) {
            line.margin_basis = to_cents(land_nominal * line.realisation() / margin_total);
        }
    }

    Ok(lines)
}

fn resolve_tier(
    kind: TierKind,
    input: &CapitalTierInput,
    total_cost: Money,
) -> FeasibilityResult<CapitalTier> {
    let field = format!("capital.{kind:?}").to_lowercase();
    let limit = match input.limit {
        LimitMethod::Fixed(amount) => amount,
        LimitMethod::Percentage(pct) => {
            validate_fraction(&format!("{field}.limit"), pct)?;
            to_cents(total_cost * pct)
        }
    };
    let establishment_fee = match input.establishment_fee {
        Some(FeeBasis::PercentOfLimit(rate)) => {
            validate_non_negative(&format!("{field}.establishment_fee"), rate)?;
            to_cents(limit * rate)
        }
        Some(FeeBasis::Fixed(amount)) => amount,
        None => Decimal::ZERO,
    };

    let tier = CapitalTier {
        kind,
        name: input.name.clone().unwrap_or_else(|| format!("{kind:?}")),
        rate: input.rate.clone(),
        line_fee_rate: input.line_fee_rate,
        establishment_fee,
        limit,
        activation_month: input.activation_month,
        interest_capitalised: input.interest_capitalised.unwrap_or(true),
    };
    tier.validate()?;
    Ok(tier)
}

fn resolve_equity(
    input: &EquityInput,
    land_nominal: Money,
    total_cost: Money,
) -> FeasibilityResult<EquityPlan> {
    let percentage = || {
        input.percentage.ok_or_else(|| {
            FeasibilityError::config(
                "capital.equity.percentage",
                format!("required for {:?} equity", input.mode),
            )
        })
    };

    let plan = match input.mode {
        EquityMode::LumpSum => EquityPlan::LumpSum {
            amount: input.initial_contribution,
        },
        EquityMode::Instalments => {
            let mut schedule = Vec::with_capacity(input.instalments.len() + 1);
            if !input.initial_contribution.is_zero() {
                schedule.push(Instalment {
                    month: 0,
                    amount: input.initial_contribution,
                });
            }
            schedule.extend(input.instalments.iter().copied());
            EquityPlan::Instalments { schedule }
        }
        EquityMode::PercentOfLand => {
            let pct = percentage()?;
            validate_fraction("capital.equity.percentage", pct)?;
            EquityPlan::Pool {
                commitment: to_cents(land_nominal * pct),
                basis: PoolBasis::PercentOfLand,
            }
        }
        EquityMode::PercentOfTotalCost => {
            let pct = percentage()?;
            validate_fraction("capital.equity.percentage", pct)?;
            EquityPlan::Pool {
                commitment: to_cents(total_cost * pct),
                basis: PoolBasis::PercentOfTotalCost,
            }
        }
        EquityMode::PariPassu => EquityPlan::PariPassu {
            share: percentage()?,
        },
    };
    Ok(plan)
}

fn resolve_capital(
    input: &CapitalInput,
    land_nominal: Money,
    total_cost: Money,
) -> FeasibilityResult<CapitalStack> {
    let senior = input
        .senior
        .as_ref()
        .map(|t| resolve_tier(TierKind::Senior, t, total_cost))
        .transpose()?;
    let mezzanine = input
        .mezzanine
        .as_ref()
        .map(|t| resolve_tier(TierKind::Mezzanine, t, total_cost))
        .transpose()?;

    let stack = CapitalStack {
        senior,
        mezzanine,
        equity: resolve_equity(&input.equity, land_nominal, total_cost)?,
        funding_order: input
            .funding_order
            .clone()
            .unwrap_or_else(default_funding_order),
        surplus_policy: input.surplus_policy.unwrap_or_default(),
        surplus_funds_rate: input.surplus_funds_rate.unwrap_or(Decimal::ZERO),
    };
    stack.validate()?;
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feasibility::fixtures::sample_input;
    use crate::tax::{BracketMethod, TaxBracket, TaxSchedule};
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_applied_once() {
        let resolved = resolve_scenario(&sample_input()).unwrap();
        assert_eq!(resolved.settings.gst_rate, dec!(0.10));
        assert_eq!(resolved.settings.completion_month, 15);
        assert!(resolved.settings.include_stamp_duty);
        assert_eq!(resolved.site.ownership, Ownership::General);
        assert_eq!(resolved.site.land_value, dec!(2000000));
        assert_eq!(resolved.capital.funding_order, default_funding_order());
        assert_eq!(resolved.capital.surplus_policy, SurplusPolicy::RepayDebt);
    }

    #[test]
    fn test_driver_based_costs_resolved() {
        let resolved = resolve_scenario(&sample_input()).unwrap();
        assert_eq!(resolved.costs[1].amount, dec!(3000000));
        assert_eq!(resolved.costs[2].amount, dec!(240000));
    }

    #[test]
    fn test_stamp_duty_line_injected() {
        let resolved = resolve_scenario(&sample_input()).unwrap();
        // 1,000 + 5% x (2,000,000 - 100,000)
        assert_eq!(resolved.stamp_duty, dec!(96000));
        let line = resolved
            .costs
            .iter()
            .find(|c| c.origin == LineOrigin::StampDuty)
            .unwrap();
        assert_eq!(line.category, CostCategory::Statutory);
        assert_eq!(line.gst, GstTreatment::GstFree);
        assert_eq!(line.start_month, 0);
    }

    #[test]
    fn test_stamp_duty_can_be_switched_off() {
        let mut input = sample_input();
        input.settings.include_stamp_duty = Some(false);
        let resolved = resolve_scenario(&input).unwrap();
        assert_eq!(resolved.stamp_duty, Decimal::ZERO);
        assert!(resolved.costs.iter().all(|c| c.origin != LineOrigin::StampDuty));
    }

    #[test]
    fn test_land_tax_charged_each_year() {
        let mut input = sample_input();
        input.tax_table = TaxTable::new(vec![TaxSchedule {
            jurisdiction: Jurisdiction::NSW,
            kind: TaxKind::LandTaxGeneral,
            brackets: vec![TaxBracket {
                limit: Decimal::ZERO,
                rate: dec!(0.02),
                base: dec!(500),
                method: BracketMethod::Flat,
            }],
        }])
        .unwrap();
        input.site.land_value = Some(dec!(800000));
        let resolved = resolve_scenario(&input).unwrap();
        assert_eq!(resolved.annual_land_tax, dec!(16500));
        let months: Vec<Month> = resolved
            .costs
            .iter()
            .filter(|c| matches!(c.origin, LineOrigin::LandTax { .. }))
            .map(|c| c.start_month)
            .collect();
        assert_eq!(months, vec![0, 12]);
    }

    #[test]
    fn test_margin_basis_is_land_cost() {
        let resolved = resolve_scenario(&sample_input()).unwrap();
        assert_eq!(resolved.revenues[0].margin_basis, dec!(2000000));
        assert_eq!(resolved.revenues[0].realisation(), dec!(8500000));
    }

    #[test]
    fn test_zero_span_rejected_before_simulation() {
        let mut input = sample_input();
        input.costs[1].span = 0;
        let err = resolve_scenario(&input).unwrap_err();
        assert!(err.to_string().contains("costs[1].span"));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut input = sample_input();
        input.settings.duration_months = 0;
        assert!(resolve_scenario(&input).is_err());
    }

    #[test]
    fn test_negative_amount_needs_credit_flag() {
        let mut input = sample_input();
        input.costs[0].input = CostInput::Fixed {
            amount: dec!(-100),
        };
        assert!(resolve_scenario(&input).is_err());
        input.costs[0].is_credit = true;
        assert!(resolve_scenario(&input).is_ok());
    }

    #[test]
    fn test_capitalised_hold_needs_cap_rate() {
        let mut input = sample_input();
        input.revenues[0].strategy = RevenueStrategy::Hold(HoldTerms {
            lease_up_months: 2,
            vacancy: dec!(0.05),
            opex: dec!(0.2),
            cap_rate: Decimal::ZERO,
            capitalised: true,
        });
        assert!(resolve_scenario(&input).is_err());
    }

    #[test]
    fn test_hold_noi_and_capitalised_value() {
        let mut input = sample_input();
        input.revenues[0].calculation = RevenueCalculation::LumpSum {
            amount: dec!(100000),
        };
        input.revenues[0].gst = GstTreatment::GstFree;
        input.revenues[0].strategy = RevenueStrategy::Hold(HoldTerms {
            lease_up_months: 2,
            vacancy: dec!(0.05),
            opex: dec!(0.2),
            cap_rate: dec!(0.05),
            capitalised: true,
        });
        let resolved = resolve_scenario(&input).unwrap();
        match &resolved.revenues[0].timing {
            RevenueTiming::Hold {
                annual_noi,
                income_start,
                capitalised_value,
                ..
            } => {
                assert_eq!(*annual_noi, dec!(76000));
                assert_eq!(*income_start, 17);
                assert_eq!(*capitalised_value, Some(dec!(1520000)));
            }
            other => panic!("expected hold, got {other:?}"),
        }
    }

    #[test]
    fn test_capitalised_value_guards_zero_cap_rate() {
        assert_eq!(capitalised_value(dec!(1000), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_percentage_limit_resolves_against_total_cost() {
        let mut input = sample_input();
        input.capital.senior = Some(CapitalTierInput {
            name: None,
            rate: RateMode::Single { rate: dec!(0.07) },
            line_fee_rate: Decimal::ZERO,
            establishment_fee: Some(FeeBasis::PercentOfLimit(dec!(0.01))),
            limit: LimitMethod::Percentage(dec!(0.5)),
            activation_month: 0,
            interest_capitalised: None,
        });
        let resolved = resolve_scenario(&input).unwrap();
        let senior = resolved.capital.senior.unwrap();
        // Land 2,000,000 + build 3,000,000 + design 240,000 + duty 96,000
        assert_eq!(senior.limit, dec!(2668000));
        assert_eq!(senior.establishment_fee, dec!(26680));
        assert!(senior.interest_capitalised);
        assert_eq!(senior.name, "Senior");
    }

    #[test]
    fn test_percentage_equity_requires_percentage() {
        let mut input = sample_input();
        input.capital.equity.mode = EquityMode::PercentOfLand;
        assert!(resolve_scenario(&input).is_err());
        input.capital.equity.percentage = Some(dec!(0.5));
        let resolved = resolve_scenario(&input).unwrap();
        assert_eq!(
            resolved.capital.equity,
            EquityPlan::Pool {
                commitment: dec!(1000000),
                basis: PoolBasis::PercentOfLand
            }
        );
    }

    #[test]
    fn test_out_of_range_months_rejected_not_overflowed() {
        let mut input = sample_input();
        input.settings.construction_start = u32::MAX;
        let err = resolve_scenario(&input).unwrap_err();
        assert!(err.to_string().contains("settings.construction_span"));

        let mut input = sample_input();
        input.revenues[0].strategy = RevenueStrategy::Sell(SellTerms {
            settlement_offset: u32::MAX,
            settlement_span: 1,
        });
        let err = resolve_scenario(&input).unwrap_err();
        assert!(err.to_string().contains("revenues[0].settlement_offset"));

        let mut input = sample_input();
        input.revenues[0].strategy = RevenueStrategy::Hold(HoldTerms {
            lease_up_months: u32::MAX - 3,
            vacancy: Decimal::ZERO,
            opex: Decimal::ZERO,
            cap_rate: Decimal::ZERO,
            capitalised: false,
        });
        let err = resolve_scenario(&input).unwrap_err();
        assert!(err.to_string().contains("revenues[0].lease_up_months"));
    }

    #[test]
    fn test_completion_after_horizon_rejected() {
        let mut input = sample_input();
        input.settings.construction_span = 30;
        assert!(resolve_scenario(&input).is_err());
    }
}

use serde::{Deserialize, Serialize};

use crate::capital::{FundingSource, Instalment, RateMode, SurplusPolicy};
use crate::error::FeasibilityError;
use crate::feasibility::scenario::{
    CapitalTierInput, CostCategory, CostInput, CostItemInput, EquityMode, FeeBasis, LimitMethod,
    RevenueCalculation, RevenueItemInput, RevenueStrategy, ScenarioInput,
};
use crate::schedule::DistributionMethod;
use crate::tax::GstTreatment;
use crate::types::{Money, Month, Rate};
use crate::FeasibilityResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingsUpdate {
    DurationMonths(u32),
    ConstructionStart(Month),
    ConstructionSpan(u32),
    DiscountRate(Rate),
    GstRate(Option<Rate>),
    IncludeStampDuty(bool),
    IncludeLandTax(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CostUpdate {
    Description(String),
    Category(CostCategory),
    Input(CostInput),
    StartMonth(Month),
    Span(u32),
    Method(DistributionMethod),
    EscalationRate(Rate),
    Gst(GstTreatment),
    IsCredit(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RevenueUpdate {
    Description(String),
    Strategy(RevenueStrategy),
    Calculation(RevenueCalculation),
    CommissionRate(Rate),
    Gst(GstTreatment),
}

/// Change to a debt tier. Field changes need the tier to exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TierUpdate {
    Set(CapitalTierInput),
    Remove,
    Rate(RateMode),
    LineFeeRate(Rate),
    EstablishmentFee(Option<FeeBasis>),
    Limit(LimitMethod),
    ActivationMonth(Month),
    InterestCapitalised(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EquityUpdate {
    Mode(EquityMode),
    InitialContribution(Money),
    Instalments(Vec<Instalment>),
    Percentage(Option<Rate>),
}

/// A single typed edit to a stored scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioUpdate {
    Settings(SettingsUpdate),
    AddCost(CostItemInput),
    RemoveCost(usize),
    Cost { index: usize, change: CostUpdate },
    AddRevenue(RevenueItemInput),
    RemoveRevenue(usize),
    Revenue { index: usize, change: RevenueUpdate },
    Senior(TierUpdate),
    Mezzanine(TierUpdate),
    Equity(EquityUpdate),
    FundingOrder(Option<Vec<FundingSource>>),
    SurplusPolicy(Option<SurplusPolicy>),
    SurplusFundsRate(Option<Rate>),
}

fn index_error(collection: &str, index: usize, len: usize) -> FeasibilityError {
    FeasibilityError::config(
        format!("{collection}[{index}]"),
        format!("index out of range ({len} items)"),
    )
}

fn item_mut<'a, T>(items: &'a mut [T], collection: &str, index: usize) -> FeasibilityResult<&'a mut T> {
    let len = items.len();
    items.get_mut(index).ok_or_else(|| index_error(collection, index, len))
}

/// Apply `update` to a copy of `scenario`. The original is left untouched.
pub fn apply_update(
    scenario: &ScenarioInput,
    update: ScenarioUpdate,
) -> FeasibilityResult<ScenarioInput> {
    let mut next = scenario.clone();

    match update {
        ScenarioUpdate::Settings(change) => {
            let s = &mut next.settings;
            match change {
                SettingsUpdate::DurationMonths(v) => s.duration_months = v,
                SettingsUpdate::ConstructionStart(v) => s.construction_start = v,
                SettingsUpdate::ConstructionSpan(v) => s.construction_span = v,
                SettingsUpdate::DiscountRate(v) => s.discount_rate = v,
                SettingsUpdate::GstRate(v) => s.gst_rate = v,
                SettingsUpdate::IncludeStampDuty(v) => s.include_stamp_duty = Some(v),
                SettingsUpdate::IncludeLandTax(v) => s.include_land_tax = Some(v),
            }
        }
        ScenarioUpdate::AddCost(item) => next.costs.push(item),
        ScenarioUpdate::RemoveCost(index) => {
            if index >= next.costs.len() {
                return Err(index_error("costs", index, next.costs.len()));
            }
            next.costs.remove(index);
        }
        ScenarioUpdate::Cost { index, change } => {
            let item = item_mut(&mut next.costs, "costs", index)?;
            match change {
                CostUpdate::Description(v) => item.description = v,
                CostUpdate::Category(v) => item.category = v,
                CostUpdate::Input(v) => item.input = v,
                CostUpdate::StartMonth(v) => item.start_month = v,
                CostUpdate::Span(v) => item.span = v,
                CostUpdate::Method(v) => item.method = v,
                CostUpdate::EscalationRate(v) => item.escalation_rate = v,
                CostUpdate::Gst(v) => item.gst = v,
                CostUpdate::IsCredit(v) => item.is_credit = v,
            }
        }
        ScenarioUpdate::AddRevenue(item) => next.revenues.push(item),
        ScenarioUpdate::RemoveRevenue(index) => {
            if index >= next.revenues.len() {
                return Err(index_error("revenues", index, next.revenues.len()));
            }
            next.revenues.remove(index);
        }
        ScenarioUpdate::Revenue { index, change } => {
            let item = item_mut(&mut next.revenues, "revenues", index)?;
            match change {
                RevenueUpdate::Description(v) => item.description = v,
                RevenueUpdate::Strategy(v) => item.strategy = v,
                RevenueUpdate::Calculation(v) => item.calculation = v,
                RevenueUpdate::CommissionRate(v) => item.commission_rate = v,
                RevenueUpdate::Gst(v) => item.gst = v,
            }
        }
        ScenarioUpdate::Senior(change) => {
            update_tier(&mut next.capital.senior, "capital.senior", change)?
        }
        ScenarioUpdate::Mezzanine(change) => {
            update_tier(&mut next.capital.mezzanine, "capital.mezzanine", change)?
        }
        ScenarioUpdate::Equity(change) => {
            let e = &mut next.capital.equity;
            match change {
                EquityUpdate::Mode(v) => e.mode = v,
                EquityUpdate::InitialContribution(v) => e.initial_contribution = v,
                EquityUpdate::Instalments(v) => e.instalments = v,
                EquityUpdate::Percentage(v) => e.percentage = v,
            }
        }
        ScenarioUpdate::FundingOrder(v) => next.capital.funding_order = v,
        ScenarioUpdate::SurplusPolicy(v) => next.capital.surplus_policy = v,
        ScenarioUpdate::SurplusFundsRate(v) => next.capital.surplus_funds_rate = v,
    }

    Ok(next)
}

fn configured<'a>(
    slot: &'a mut Option<CapitalTierInput>,
    field: &str,
) -> FeasibilityResult<&'a mut CapitalTierInput> {
    slot.as_mut()
        .ok_or_else(|| FeasibilityError::config(field, "tier is not configured"))
}

fn update_tier(
    slot: &mut Option<CapitalTierInput>,
    field: &str,
    change: TierUpdate,
) -> FeasibilityResult<()> {
    match change {
        TierUpdate::Set(tier) => *slot = Some(tier),
        TierUpdate::Remove => *slot = None,
        TierUpdate::Rate(v) => configured(slot, field)?.rate = v,
        TierUpdate::LineFeeRate(v) => configured(slot, field)?.line_fee_rate = v,
        TierUpdate::EstablishmentFee(v) => configured(slot, field)?.establishment_fee = v,
        TierUpdate::Limit(v) => configured(slot, field)?.limit = v,
        TierUpdate::ActivationMonth(v) => configured(slot, field)?.activation_month = v,
        TierUpdate::InterestCapitalised(v) => {
            configured(slot, field)?.interest_capitalised = Some(v)
        }
    }
    Ok(())
}

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::capital::{run_waterfall, TierKind, TierMonth, WaterfallMonth};
use crate::feasibility::cashflow::build_cashflows;
use crate::feasibility::scenario::{resolve_scenario, ResolvedScenario, ScenarioInput};
use crate::feasibility::summary::{
    category_totals, line_item_totals, summarise, CategoryTotal, FeasibilitySummary, LineItemTotal,
};
use crate::types::{with_metadata, ComputationOutput, Money, Month};
use crate::FeasibilityResult;

/// A per-tier pair of amounts. Absent tiers report zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierAmounts {
    pub senior: Money,
    pub mezzanine: Money,
}

impl TierAmounts {
    fn from_months(
        senior: Option<&TierMonth>,
        mezzanine: Option<&TierMonth>,
        pick: impl Fn(&TierMonth) -> Money,
    ) -> Self {
        TierAmounts {
            senior: senior.map(&pick).unwrap_or(Decimal::ZERO),
            mezzanine: mezzanine.map(&pick).unwrap_or(Decimal::ZERO),
        }
    }

    pub fn total(&self) -> Money {
        self.senior + self.mezzanine
    }
}

/// One month of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashflowRecord {
    pub month: Month,
    /// First day of the month when the scenario has a start date
    pub period_start: Option<NaiveDate>,
    pub gross_outflow: Money,
    pub gross_inflow: Money,
    pub gst_collected: Money,
    pub input_tax_credits: Money,
    /// Project cashflow before finance, net of GST
    pub net_cashflow: Money,
    pub interest_accrued: TierAmounts,
    pub debt_balance: TierAmounts,
    pub fees: TierAmounts,
    pub debt_drawn: TierAmounts,
    pub debt_repaid: TierAmounts,
    pub finance_costs_paid: Money,
    pub surplus_interest: Money,
    pub equity_drawn: Money,
    pub equity_repaid: Money,
    pub cash_balance: Money,
    pub funding_shortfall: Money,
}

impl MonthlyCashflowRecord {
    /// Cashflow to equity: distributions less injections.
    pub fn equity_cashflow(&self) -> Money {
        self.equity_repaid - self.equity_drawn
    }
}

/// Complete simulation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityOutput {
    pub scenario: String,
    pub months: Vec<MonthlyCashflowRecord>,
    pub summary: FeasibilitySummary,
    pub category_totals: Vec<CategoryTotal>,
    pub line_items: Vec<LineItemTotal>,
    pub warnings: Vec<String>,
}

fn period_start(start: Option<NaiveDate>, month: Month) -> Option<NaiveDate> {
    start.and_then(|d| d.checked_add_months(Months::new(month)))
}

fn record(
    month: Month,
    start_date: Option<NaiveDate>,
    flows: (Money, Money, Money, Money, Money),
    capital: &WaterfallMonth,
) -> MonthlyCashflowRecord {
    let (gross_outflow, gross_inflow, gst_collected, input_tax_credits, net_cashflow) = flows;
    let senior = capital.senior.as_ref();
    let mezz = capital.mezzanine.as_ref();
    MonthlyCashflowRecord {
        month,
        period_start: period_start(start_date, month),
        gross_outflow,
        gross_inflow,
        gst_collected,
        input_tax_credits,
        net_cashflow,
        interest_accrued: TierAmounts::from_months(senior, mezz, |t| t.interest),
        debt_balance: TierAmounts::from_months(senior, mezz, |t| t.closing_balance),
        fees: TierAmounts::from_months(senior, mezz, |t| t.fees),
        debt_drawn: TierAmounts::from_months(senior, mezz, |t| t.drawn),
        debt_repaid: TierAmounts::from_months(senior, mezz, |t| t.repaid),
        finance_costs_paid: capital.finance_costs_paid,
        surplus_interest: capital.surplus_interest,
        equity_drawn: capital.equity_injected,
        equity_repaid: capital.equity_distributed,
        cash_balance: capital.cash_balance,
        funding_shortfall: capital.funding_shortfall,
    }
}

/// Simulate a resolved scenario month by month.
///
/// Deterministic: the same scenario always yields an identical output.
pub fn simulate(scenario: &ResolvedScenario) -> FeasibilityResult<FeasibilityOutput> {
    let cashflows = build_cashflows(scenario)?;
    let waterfall = run_waterfall(&scenario.capital, &cashflows.requirements());
    let summary = summarise(scenario, &cashflows, &waterfall)?;

    let months = waterfall
        .months
        .iter()
        .enumerate()
        .map(|(m, capital)| {
            let flows = (
                cashflows.gross_outflow[m],
                cashflows.gross_inflow[m],
                cashflows.gst_collected[m],
                cashflows.input_tax_credits[m],
                cashflows.net_cashflow[m],
            );
            record(m as Month, scenario.settings.start_date, flows, capital)
        })
        .collect();

    let mut warnings = cashflows.warnings.clone();
    if let Some(first) = waterfall.months.iter().find(|m| !m.funding_shortfall.is_zero()) {
        warnings.push(format!(
            "Funding shortfall of {} first carried at month {}",
            first.funding_shortfall, first.month
        ));
    }
    if !summary.terminal_debt.is_zero() {
        warnings.push(format!(
            "Debt of {} outstanding at the end of the horizon",
            summary.terminal_debt
        ));
    }
    for kind in [TierKind::Senior, TierKind::Mezzanine] {
        if let Some(tier) = scenario.capital.tier(kind) {
            let peak = waterfall
                .months
                .iter()
                .filter_map(|m| match kind {
                    TierKind::Senior => m.senior.as_ref(),
                    TierKind::Mezzanine => m.mezzanine.as_ref(),
                })
                .map(|t| t.closing_balance)
                .fold(Decimal::ZERO, Decimal::max);
            if peak > tier.limit {
                warnings.push(format!(
                    "{} balance peaks at {peak}, above its {} limit, through capitalised interest",
                    tier.name, tier.limit
                ));
            }
        }
    }
    if summary.project_irr.rate().is_none() {
        warnings.push("Project IRR undefined for this cashflow".to_string());
    }

    Ok(FeasibilityOutput {
        scenario: scenario.name.clone(),
        months,
        summary,
        category_totals: category_totals(&cashflows),
        line_items: line_item_totals(&cashflows),
        warnings,
    })
}

/// Resolve, simulate and wrap a stored scenario.
pub fn run_feasibility(
    input: &ScenarioInput,
) -> FeasibilityResult<ComputationOutput<FeasibilityOutput>> {
    let start = Instant::now();
    tracing::info!(
        scenario = %input.name,
        costs = input.costs.len(),
        revenues = input.revenues.len(),
        "running feasibility"
    );

    let resolved = resolve_scenario(input)?;
    let output = simulate(&resolved)?;

    tracing::info!(
        scenario = %output.scenario,
        profit = %output.summary.profit,
        npv = %output.summary.project_npv,
        warnings = output.warnings.len(),
        "feasibility complete"
    );

    let warnings = output.warnings.clone();
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly development feasibility: distributed costs and revenue, GST netting, \
         tiered capital waterfall, monthly DCF",
        input,
        warnings,
        elapsed,
        output,
    ))
}

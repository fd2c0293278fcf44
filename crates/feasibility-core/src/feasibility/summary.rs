use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::capital::WaterfallOutcome;
use crate::feasibility::cashflow::{LineCashflow, LineKind, ProjectCashflows};
use crate::feasibility::scenario::{CostCategory, LineOrigin, ResolvedScenario};
use crate::time_value::{irr, monthly_npv, IrrOutcome};
use crate::types::{ratio, Money, Rate};
use crate::FeasibilityResult;

/// Headline feasibility figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilitySummary {
    /// Revenue net of GST
    pub total_revenue: Money,
    pub gross_revenue: Money,
    pub gst_collected: Money,
    /// Costs net of input tax credits, before finance
    pub total_development_cost: Money,
    pub total_itc: Money,
    pub land_total: Money,
    pub construction_total: Money,
    pub stamp_duty: Money,
    pub land_tax: Money,
    pub interest_total: Money,
    pub fees_total: Money,
    pub surplus_interest_earned: Money,
    /// interest + fees - surplus interest
    pub finance_total: Money,
    pub profit: Money,
    /// Profit over development cost plus finance
    pub margin_on_cost: Option<Rate>,
    pub project_npv: Money,
    /// Unlevered, annualised
    pub project_irr: IrrOutcome,
    /// Levered, annualised
    pub equity_irr: IrrOutcome,
    pub peak_debt: Money,
    pub total_equity: Money,
    pub equity_distributed: Money,
    pub equity_multiple: Option<Decimal>,
    pub peak_shortfall: Money,
    pub terminal_debt: Money,
    pub terminal_shortfall: Money,
    /// Present value of land outlays at which project NPV is zero
    pub residual_land_value: Money,
}

/// Totals for one cost category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: CostCategory,
    pub gross: Money,
    pub itc: Money,
    pub net: Money,
}

/// Totals for one cost or revenue line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemTotal {
    pub description: String,
    /// `None` for revenue lines
    pub category: Option<CostCategory>,
    pub gross: Money,
    pub gst: Money,
    pub net: Money,
}

impl From<&LineCashflow> for LineItemTotal {
    fn from(line: &LineCashflow) -> Self {
        LineItemTotal {
            description: line.description.clone(),
            category: line.category(),
            gross: line.total_gross(),
            gst: line.total_gst(),
            net: line.total_net(),
        }
    }
}

/// Opening budget record for a cost line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub description: String,
    pub category: CostCategory,
    pub original: Money,
    pub committed: Money,
    pub actual: Money,
    pub forecast: Money,
}

/// Seed budget lines from cost line totals. Original and forecast both start
/// at the net cost; revenue lines are skipped.
pub fn seed_budget(lines: &[LineItemTotal]) -> Vec<BudgetLine> {
    lines
        .iter()
        .filter_map(|line| {
            line.category.map(|category| BudgetLine {
                description: line.description.clone(),
                category,
                original: line.net,
                committed: Decimal::ZERO,
                actual: Decimal::ZERO,
                forecast: line.net,
            })
        })
        .collect()
}

pub fn category_totals(cashflows: &ProjectCashflows) -> Vec<CategoryTotal> {
    CostCategory::ALL
        .iter()
        .filter_map(|category| {
            let lines: Vec<&LineCashflow> = cashflows
                .costs
                .iter()
                .filter(|l| l.kind == LineKind::Cost(*category))
                .collect();
            if lines.is_empty() {
                return None;
            }
            let gross: Money = lines.iter().map(|l| l.total_gross()).sum();
            let itc: Money = lines.iter().map(|l| l.total_itc()).sum();
            Some(CategoryTotal {
                category: *category,
                gross,
                itc,
                net: gross - itc,
            })
        })
        .collect()
}

pub fn line_item_totals(cashflows: &ProjectCashflows) -> Vec<LineItemTotal> {
    cashflows
        .costs
        .iter()
        .chain(&cashflows.revenues)
        .map(LineItemTotal::from)
        .collect()
}

/// Aggregate project cashflows and the capital waterfall into headline figures.
pub fn summarise(
    scenario: &ResolvedScenario,
    cashflows: &ProjectCashflows,
    waterfall: &WaterfallOutcome,
) -> FeasibilityResult<FeasibilitySummary> {
    let gross_revenue: Money = cashflows.gross_inflow.iter().copied().sum();
    let gst_collected: Money = cashflows.gst_collected.iter().copied().sum();
    let gross_cost: Money = cashflows.gross_outflow.iter().copied().sum();
    let total_itc: Money = cashflows.input_tax_credits.iter().copied().sum();
    let total_revenue = gross_revenue - gst_collected;
    let total_development_cost = gross_cost - total_itc;

    let category_net = |category: CostCategory| -> Money {
        cashflows
            .costs
            .iter()
            .filter(|l| l.kind == LineKind::Cost(category))
            .map(|l| l.total_net())
            .sum()
    };

    let state = &waterfall.final_state;
    let interest_total: Money = state.tiers.iter().map(|t| t.interest_total).sum();
    let fees_total: Money = state.tiers.iter().map(|t| t.fees_total).sum();
    let surplus_interest_earned = state.surplus_interest_total;
    let finance_total = interest_total + fees_total - surplus_interest_earned;
    let profit = total_revenue - total_development_cost - finance_total;

    let discount_rate = scenario.settings.discount_rate;
    let project_npv = monthly_npv(discount_rate, &cashflows.net_cashflow)?;

    let equity_flows: Vec<Money> = waterfall
        .months
        .iter()
        .map(|m| m.equity_distributed - m.equity_injected)
        .collect();

    let len = cashflows.net_cashflow.len();
    let mut land_series = vec![Decimal::ZERO; len];
    for line in cashflows
        .costs
        .iter()
        .filter(|l| l.kind == LineKind::Cost(CostCategory::Land))
    {
        for (slot, (gross, itc)) in land_series.iter_mut().zip(line.gross.iter().zip(&line.itc)) {
            *slot += *gross - *itc;
        }
    }
    let land_pv = monthly_npv(discount_rate, &land_series)?;

    Ok(FeasibilitySummary {
        total_revenue,
        gross_revenue,
        gst_collected,
        total_development_cost,
        total_itc,
        land_total: category_net(CostCategory::Land),
        construction_total: category_net(CostCategory::Construction),
        stamp_duty: scenario.stamp_duty,
        land_tax: scenario
            .costs
            .iter()
            .filter(|c| matches!(c.origin, LineOrigin::LandTax { .. }))
            .map(|c| c.amount)
            .sum(),
        interest_total,
        fees_total,
        surplus_interest_earned,
        finance_total,
        profit,
        margin_on_cost: ratio(profit, total_development_cost + finance_total),
        project_npv,
        project_irr: irr(&cashflows.net_cashflow).annualised(),
        equity_irr: irr(&equity_flows).annualised(),
        peak_debt: peak(waterfall.months.iter().map(|m| m.total_debt)),
        total_equity: state.equity_injected_total,
        equity_distributed: state.equity_distributed_total,
        equity_multiple: ratio(state.equity_distributed_total, state.equity_injected_total),
        peak_shortfall: peak(waterfall.months.iter().map(|m| m.funding_shortfall)),
        terminal_debt: state.total_debt(),
        terminal_shortfall: state.unfunded,
        residual_land_value: land_pv + project_npv,
    })
}

fn peak(values: impl Iterator<Item = Money>) -> Money {
    values.fold(Decimal::ZERO, Decimal::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_budget_seed_skips_revenue() {
        let lines = vec![
            LineItemTotal {
                description: "Build".into(),
                category: Some(CostCategory::Construction),
                gross: dec!(1100),
                gst: dec!(100),
                net: dec!(1000),
            },
            LineItemTotal {
                description: "Sales".into(),
                category: None,
                gross: dec!(5000),
                gst: Decimal::ZERO,
                net: dec!(5000),
            },
        ];
        let budget = seed_budget(&lines);
        assert_eq!(budget.len(), 1);
        assert_eq!(budget[0].original, dec!(1000));
        assert_eq!(budget[0].forecast, dec!(1000));
        assert_eq!(budget[0].committed, Decimal::ZERO);
        assert_eq!(budget[0].actual, Decimal::ZERO);
    }
}

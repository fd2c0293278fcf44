use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::feasibility::scenario::{
    CostCategory, CostLine, ResolvedScenario, RevenueLine, RevenueTiming,
};
use crate::schedule::distribution::settle_to_cents;
use crate::schedule::{distribute, DistributionMethod};
use crate::tax::gst::{apportion, split_cost, split_revenue, GstSeries};
use crate::tax::GstTreatment;
use crate::types::{to_cents, Money, Month, Rate};
use crate::FeasibilityResult;

/// What a monthly line series represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    Cost(CostCategory),
    Revenue,
}

/// One line item laid over the horizon, with its GST split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineCashflow {
    pub description: String,
    pub kind: LineKind,
    /// Resolved amount before escalation
    pub nominal: Money,
    pub gross: Vec<Money>,
    pub net: Vec<Money>,
    pub gst: Vec<Money>,
    pub itc: Vec<Money>,
}

impl LineCashflow {
    fn new(description: String, kind: LineKind, nominal: Money, gross: Vec<Money>, split: GstSeries) -> Self {
        LineCashflow {
            description,
            kind,
            nominal,
            gross,
            net: split.net,
            gst: split.gst,
            itc: split.itc,
        }
    }

    pub fn total_gross(&self) -> Money {
        self.gross.iter().copied().sum()
    }

    pub fn total_net(&self) -> Money {
        self.net.iter().copied().sum()
    }

    pub fn total_gst(&self) -> Money {
        self.gst.iter().copied().sum()
    }

    pub fn total_itc(&self) -> Money {
        self.itc.iter().copied().sum()
    }

    pub fn category(&self) -> Option<CostCategory> {
        match self.kind {
            LineKind::Cost(c) => Some(c),
            LineKind::Revenue => None,
        }
    }
}

/// Project cashflows before finance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCashflows {
    pub costs: Vec<LineCashflow>,
    pub revenues: Vec<LineCashflow>,
    pub gross_outflow: Vec<Money>,
    pub gross_inflow: Vec<Money>,
    pub gst_collected: Vec<Money>,
    pub input_tax_credits: Vec<Money>,
    /// Inflow net of GST less outflow net of credits
    pub net_cashflow: Vec<Money>,
    pub warnings: Vec<String>,
}

impl ProjectCashflows {
    /// Monthly requirement for the capital stack (positive = cash needed).
    pub fn requirements(&self) -> Vec<Money> {
        self.net_cashflow.iter().map(|v| -*v).collect()
    }
}

/// Distribute every resolved line and aggregate by month.
pub fn build_cashflows(scenario: &ResolvedScenario) -> FeasibilityResult<ProjectCashflows> {
    let duration = scenario.settings.duration_months;
    let gst_rate = scenario.settings.gst_rate;
    let mut warnings = Vec::new();

    let mut costs = Vec::with_capacity(scenario.costs.len() + scenario.revenues.len());
    for line in &scenario.costs {
        costs.push(cost_line(line, gst_rate, duration, &mut warnings)?);
    }

    let mut revenues = Vec::with_capacity(scenario.revenues.len());
    for line in &scenario.revenues {
        let (income, commission) = revenue_lines(line, gst_rate, duration, &mut warnings)?;
        revenues.extend(income);
        costs.extend(commission);
    }

    let len = duration as usize;
    let gross_outflow = sum_by_month(len, costs.iter().map(|l| &l.gross));
    let gross_inflow = sum_by_month(len, revenues.iter().map(|l| &l.gross));
    let gst_collected = sum_by_month(len, revenues.iter().map(|l| &l.gst));
    let input_tax_credits = sum_by_month(len, costs.iter().map(|l| &l.itc));

    let net_cashflow = (0..len)
        .map(|m| gross_inflow[m] - gst_collected[m] - gross_outflow[m] + input_tax_credits[m])
        .collect();

    Ok(ProjectCashflows {
        costs,
        revenues,
        gross_outflow,
        gross_inflow,
        gst_collected,
        input_tax_credits,
        net_cashflow,
        warnings,
    })
}

fn sum_by_month<'a>(len: usize, series: impl Iterator<Item = &'a Vec<Money>>) -> Vec<Money> {
    let mut totals = vec![Decimal::ZERO; len];
    for s in series {
        for (slot, v) in totals.iter_mut().zip(s) {
            *slot += *v;
        }
    }
    totals
}

fn cost_line(
    line: &CostLine,
    gst_rate: Rate,
    duration: u32,
    warnings: &mut Vec<String>,
) -> FeasibilityResult<LineCashflow> {
    let dist = distribute(
        line.amount,
        line.start_month,
        line.span,
        line.method,
        line.escalation_rate,
        duration,
    )?;
    if dist.truncated {
        warnings.push(format!(
            "{}: span ends after month {}; tail folded into the final month",
            line.description,
            duration - 1
        ));
    }
    let split = apportion(&dist.series, split_cost(dist.total, line.gst, gst_rate));
    Ok(LineCashflow::new(
        line.description.clone(),
        LineKind::Cost(line.category),
        line.amount,
        dist.series,
        split,
    ))
}

/// Income lines for one revenue item plus its selling commission, if any.
fn revenue_lines(
    line: &RevenueLine,
    gst_rate: Rate,
    duration: u32,
    warnings: &mut Vec<String>,
) -> FeasibilityResult<(Vec<LineCashflow>, Option<LineCashflow>)> {
    let mut income = Vec::with_capacity(2);
    // Series the commission is charged against
    let realisation: Vec<Money>;

    match &line.timing {
        RevenueTiming::Sale {
            gross,
            start_month,
            span,
        } => {
            let dist = distribute(
                *gross,
                *start_month,
                *span,
                DistributionMethod::Linear,
                Decimal::ZERO,
                duration,
            )?;
            if dist.truncated {
                warnings.push(format!(
                    "{}: settlements run past month {}; remainder settled in the final month",
                    line.description,
                    duration - 1
                ));
            }
            let split = apportion(
                &dist.series,
                split_revenue(dist.total, line.gst, gst_rate, line.margin_basis),
            );
            realisation = dist.series.clone();
            income.push(LineCashflow::new(
                line.description.clone(),
                LineKind::Revenue,
                *gross,
                dist.series,
                split,
            ));
        }
        RevenueTiming::Hold {
            annual_noi,
            income_start,
            cap_rate,
            capitalised_value,
        } => {
            let rent = rent_series(*annual_noi, *income_start, duration);
            if *income_start >= duration && !annual_noi.is_zero() {
                warnings.push(format!(
                    "{}: income starts in month {income_start}, after the horizon",
                    line.description
                ));
            }
            if cap_rate.is_zero() && capitalised_value.is_none() {
                warnings.push(format!(
                    "{}: zero cap rate; the held asset carries no terminal value",
                    line.description
                ));
            }
            // Rent is not a margin-scheme supply
            let rent_treatment = match line.gst {
                GstTreatment::MarginScheme => GstTreatment::GstFree,
                other => other,
            };
            let rent_total: Money = rent.iter().copied().sum();
            let split = apportion(
                &rent,
                split_revenue(rent_total, rent_treatment, gst_rate, Decimal::ZERO),
            );
            income.push(LineCashflow::new(
                line.description.clone(),
                LineKind::Revenue,
                rent_total,
                rent,
                split,
            ));

            let mut terminal = vec![Decimal::ZERO; duration as usize];
            if let Some(value) = capitalised_value {
                let dist = distribute(
                    *value,
                    duration - 1,
                    1,
                    DistributionMethod::Upfront,
                    Decimal::ZERO,
                    duration,
                )?;
                let split = apportion(
                    &dist.series,
                    split_revenue(dist.total, line.gst, gst_rate, line.margin_basis),
                );
                terminal = dist.series.clone();
                income.push(LineCashflow::new(
                    format!("{} (capitalised value)", line.description),
                    LineKind::Revenue,
                    *value,
                    dist.series,
                    split,
                ));
            }
            realisation = terminal;
        }
    }

    let commission = commission_line(line, &realisation, gst_rate);
    Ok((income, commission))
}

/// Monthly NOI from `income_start` to the horizon.
fn rent_series(annual_noi: Money, income_start: Month, duration: u32) -> Vec<Money> {
    let monthly = annual_noi / dec!(12);
    let raw: Vec<Money> = (0..duration)
        .map(|m| if m >= income_start { monthly } else { Decimal::ZERO })
        .collect();
    let total = to_cents(raw.iter().copied().sum());
    settle_to_cents(&raw, total)
}

fn commission_line(line: &RevenueLine, realisation: &[Money], gst_rate: Rate) -> Option<LineCashflow> {
    if line.commission_rate.is_zero() {
        return None;
    }
    let total = to_cents(realisation.iter().copied().sum::<Money>() * line.commission_rate);
    if total.is_zero() {
        return None;
    }
    let raw: Vec<Money> = realisation.iter().map(|v| *v * line.commission_rate).collect();
    let series = settle_to_cents(&raw, total);
    let split = apportion(&series, split_cost(total, GstTreatment::Taxable, gst_rate));
    Some(LineCashflow::new(
        format!("{} commission", line.description),
        LineKind::Cost(CostCategory::Selling),
        total,
        series,
        split,
    ))
}

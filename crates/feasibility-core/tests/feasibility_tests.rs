use feasibility_core::capital::SurplusPolicy;
use feasibility_core::feasibility::update::{CostUpdate, RevenueUpdate, SettingsUpdate};
use feasibility_core::feasibility::{
    apply_update, resolve_scenario, run_feasibility, simulate, FeasibilityOutput, ScenarioInput,
    ScenarioUpdate,
};
use feasibility_core::feasibility::scenario::{CostInput, RevenueCalculation};
use feasibility_core::schedule::{distribute, DistributionMethod};
use feasibility_core::tax::brackets::{calculate_tax, TaxInput};
use feasibility_core::tax::{BracketMethod, Jurisdiction, TaxBracket, TaxKind, TaxSchedule, TaxTable};
use feasibility_core::time_value::{calculate_dcf, npv, DcfInput, IrrOutcome};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

const HARBOUR_STREET: &str = include_str!("../../../demos/harbour_street.json");

fn harbour_street() -> ScenarioInput {
    serde_json::from_str(HARBOUR_STREET).unwrap()
}

fn simulate_input(input: &ScenarioInput) -> FeasibilityOutput {
    simulate(&resolve_scenario(input).unwrap()).unwrap()
}

/// Two-month scenario: one 500,000 outlay against a 400,000 senior facility.
fn shortfall_scenario() -> ScenarioInput {
    serde_json::from_value(json!({
        "name": "Shortfall",
        "settings": {
            "duration_months": 2,
            "construction_start": 0,
            "construction_span": 1,
            "discount_rate": "0.10"
        },
        "site": { "name": "Lot 1", "jurisdiction": "VIC" },
        "costs": [{
            "category": "Construction",
            "description": "Works",
            "input": { "Fixed": { "amount": "500000" } },
            "start_month": 0,
            "span": 1,
            "method": "Upfront",
            "gst": "GstFree"
        }],
        "capital": {
            "senior": {
                "rate": { "Single": { "rate": "0" } },
                "limit": { "Fixed": "400000" },
                "interest_capitalised": true
            },
            "equity": { "mode": "LumpSum" }
        }
    }))
    .unwrap()
}

// ===========================================================================
// Acceptance scenarios
// ===========================================================================

#[test]
fn test_linear_distribution_exact_months() {
    let dist = distribute(
        dec!(1000000),
        0,
        10,
        DistributionMethod::Linear,
        Decimal::ZERO,
        24,
    )
    .unwrap();
    for month in 0..10 {
        assert_eq!(dist.series[month], dec!(100000));
    }
    assert_eq!(dist.series.iter().copied().sum::<Decimal>(), dec!(1000000));
}

#[test]
fn test_sliding_stamp_duty() {
    let table = TaxTable::new(vec![TaxSchedule {
        jurisdiction: Jurisdiction::NSW,
        kind: TaxKind::StampDuty,
        brackets: vec![
            TaxBracket {
                limit: dec!(100000),
                rate: Decimal::ZERO,
                base: Decimal::ZERO,
                method: BracketMethod::Sliding,
            },
            TaxBracket {
                limit: dec!(1000000),
                rate: dec!(0.05),
                base: dec!(1000),
                method: BracketMethod::Sliding,
            },
        ],
    }])
    .unwrap();
    let out = calculate_tax(&TaxInput {
        table,
        jurisdiction: Jurisdiction::NSW,
        kind: TaxKind::StampDuty,
        dutiable_value: dec!(500000),
    })
    .unwrap();
    assert_eq!(out.result.payable, dec!(21000));
}

#[test]
fn test_flat_land_tax() {
    let table = TaxTable::new(vec![TaxSchedule {
        jurisdiction: Jurisdiction::QLD,
        kind: TaxKind::LandTaxGeneral,
        brackets: vec![TaxBracket {
            limit: Decimal::ZERO,
            rate: dec!(0.02),
            base: dec!(500),
            method: BracketMethod::Flat,
        }],
    }])
    .unwrap();
    assert_eq!(
        table.resolve(&Jurisdiction::QLD, TaxKind::LandTaxGeneral, dec!(800000)),
        dec!(16500)
    );
}

#[test]
fn test_irr_zeroes_npv() {
    let flows = vec![dec!(-1000000), dec!(0), dec!(0), dec!(0), dec!(1300000)];
    let out = calculate_dcf(&DcfInput {
        cash_flows: flows.clone(),
        annual_discount_rate: dec!(0.10),
        periods_per_year: 12,
    })
    .unwrap();
    let rate = out.result.irr.rate().unwrap();
    assert!(npv(rate, &flows).unwrap().abs() < dec!(0.01));
}

#[test]
fn test_funding_shortfall_recorded_through_engine() {
    let output = simulate_input(&shortfall_scenario());
    assert_eq!(output.months[0].debt_balance.senior, dec!(400000));
    assert_eq!(output.months[0].funding_shortfall, dec!(100000));
    assert_eq!(output.summary.peak_shortfall, dec!(100000));
    assert_eq!(output.summary.terminal_shortfall, dec!(100000));
    assert_eq!(output.summary.terminal_debt, dec!(400000));
    assert!(output.warnings.iter().any(|w| w.contains("shortfall")));
}

// ===========================================================================
// Whole-scenario properties
// ===========================================================================

#[test]
fn test_demo_scenario_runs() {
    let out = run_feasibility(&harbour_street()).unwrap();
    let s = &out.result.summary;
    assert_eq!(out.result.months.len(), 30);
    assert!(s.profit > Decimal::ZERO);
    assert!(s.stamp_duty > Decimal::ZERO);
    assert!(s.land_tax > Decimal::ZERO);
    assert_eq!(s.terminal_debt, Decimal::ZERO);
    assert!(matches!(s.project_irr, IrrOutcome::Defined { .. }));
    assert!(s.margin_on_cost.is_some());
}

#[test]
fn test_cash_conservation_each_month() {
    for policy in [SurplusPolicy::RepayDebt, SurplusPolicy::RetainCash] {
        let input = apply_update(&harbour_street(), ScenarioUpdate::SurplusPolicy(Some(policy)))
            .unwrap();
        let output = simulate_input(&input);
        let mut cash = Decimal::ZERO;
        let mut shortfall = Decimal::ZERO;
        for m in &output.months {
            let expected = cash + m.surplus_interest + m.equity_drawn + m.debt_drawn.total()
                - m.debt_repaid.total()
                - m.equity_repaid
                + m.net_cashflow
                - m.finance_costs_paid
                + m.funding_shortfall
                - shortfall;
            assert_eq!(m.cash_balance, expected, "month {} under {policy:?}", m.month);
            cash = m.cash_balance;
            shortfall = m.funding_shortfall;
        }
        assert_eq!(cash, Decimal::ZERO);
    }
}

#[test]
fn test_gst_identity_per_line_and_total() {
    let output = simulate_input(&harbour_street());
    for line in &output.line_items {
        assert_eq!(line.net + line.gst, line.gross, "{}", line.description);
    }
    let s = &output.summary;
    assert_eq!(s.total_revenue + s.gst_collected, s.gross_revenue);
    let itc: Decimal = output.category_totals.iter().map(|c| c.itc).sum();
    assert_eq!(itc, s.total_itc);
}

#[test]
fn test_series_totals_match_summary() {
    let output = simulate_input(&harbour_street());
    let inflow: Decimal = output.months.iter().map(|m| m.gross_inflow).sum();
    let outflow: Decimal = output.months.iter().map(|m| m.gross_outflow).sum();
    let itc: Decimal = output.months.iter().map(|m| m.input_tax_credits).sum();
    assert_eq!(inflow, output.summary.gross_revenue);
    assert_eq!(outflow - itc, output.summary.total_development_cost);
}

#[test]
fn test_higher_cost_lowers_profit() {
    let base = harbour_street();
    let dearer = apply_update(
        &base,
        ScenarioUpdate::Cost {
            index: 1,
            change: CostUpdate::Input(CostInput::Fixed {
                amount: dec!(400000),
            }),
        },
    )
    .unwrap();
    let before = simulate_input(&base).summary;
    let after = simulate_input(&dearer).summary;
    assert!(after.profit < before.profit);
    assert!(after.project_npv < before.project_npv);
}

#[test]
fn test_higher_price_raises_profit() {
    let base = harbour_street();
    let dearer = apply_update(
        &base,
        ScenarioUpdate::Revenue {
            index: 0,
            change: RevenueUpdate::Calculation(RevenueCalculation::QuantityRate {
                units: dec!(14),
                rate: dec!(1550000),
            }),
        },
    )
    .unwrap();
    assert!(simulate_input(&dearer).summary.profit > simulate_input(&base).summary.profit);
}

#[test]
fn test_higher_discount_rate_lowers_npv() {
    let base = harbour_street();
    let steeper = apply_update(
        &base,
        ScenarioUpdate::Settings(SettingsUpdate::DiscountRate(dec!(0.20))),
    )
    .unwrap();
    assert!(simulate_input(&steeper).summary.project_npv < simulate_input(&base).summary.project_npv);
}

#[test]
fn test_repeat_runs_identical() {
    let input = harbour_street();
    let first = run_feasibility(&input).unwrap();
    let second = run_feasibility(&input).unwrap();
    assert_eq!(first.result, second.result);
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn test_residual_land_value_without_land_equals_npv() {
    let mut input = harbour_street();
    input.costs.remove(0);
    let s = simulate_input(&input).summary;
    assert_eq!(s.residual_land_value, s.project_npv);
    assert_eq!(s.stamp_duty, Decimal::ZERO);
}

#[test]
fn test_scenario_json_round_trip() {
    let input = harbour_street();
    let json = serde_json::to_string(&input).unwrap();
    let back: ScenarioInput = serde_json::from_str(&json).unwrap();
    assert_eq!(back, input);
}

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::capital::stack::{
    CapitalStack, CapitalTier, EquityPlan, FundingSource, SurplusPolicy, TierKind,
};
use crate::types::{to_cents, Money, Month};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Running position of one debt tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierState {
    pub balance: Money,
    pub drawn_total: Money,
    pub repaid_total: Money,
    pub interest_total: Money,
    pub capitalised_interest_total: Money,
    pub fees_total: Money,
}

/// Waterfall state carried from one month to the next. Each step consumes
/// the previous state and returns a new one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WaterfallState {
    /// Indexed by `TierKind::index`
    pub tiers: [TierState; 2],
    /// Equity injected but not yet spent, plus retained surplus
    pub cash: Money,
    pub equity_injected_total: Money,
    pub equity_distributed_total: Money,
    /// Drawn so far against a percentage-based equity pool
    pub pool_drawn: Money,
    /// Requirement no source could meet, carried into the next month
    pub unfunded: Money,
    pub surplus_interest_total: Money,
}

impl WaterfallState {
    pub fn tier(&self, kind: TierKind) -> &TierState {
        &self.tiers[kind.index()]
    }

    fn tier_mut(&mut self, kind: TierKind) -> &mut TierState {
        &mut self.tiers[kind.index()]
    }

    pub fn total_debt(&self) -> Money {
        self.tiers.iter().map(|t| t.balance).sum()
    }
}

// ---------------------------------------------------------------------------
// Monthly records
// ---------------------------------------------------------------------------

/// One debt tier's movements in a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierMonth {
    pub opening_balance: Money,
    pub interest: Money,
    /// Portion of `interest` added to the balance
    pub interest_capitalised: Money,
    /// Portion of `interest` paid in cash through the waterfall
    pub interest_paid: Money,
    pub fees: Money,
    pub drawn: Money,
    pub repaid: Money,
    pub closing_balance: Money,
}

/// Capital movements for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallMonth {
    pub month: Month,
    /// Project requirement before finance (positive = cash needed)
    pub project_requirement: Money,
    /// Cash interest and fees funded this month
    pub finance_costs_paid: Money,
    /// Interest credited on cash held
    pub surplus_interest: Money,
    pub equity_injected: Money,
    pub equity_distributed: Money,
    pub senior: Option<TierMonth>,
    pub mezzanine: Option<TierMonth>,
    pub cash_balance: Money,
    pub total_debt: Money,
    /// Unfunded balance carried at month end
    pub funding_shortfall: Money,
}

/// Result of running the fold over the horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallOutcome {
    pub months: Vec<WaterfallMonth>,
    pub final_state: WaterfallState,
}

// ---------------------------------------------------------------------------
// Fold
// ---------------------------------------------------------------------------

/// Run the capital stack over a monthly project requirement series. The last
/// entry is the terminal month.
pub fn run_waterfall(stack: &CapitalStack, requirements: &[Money]) -> WaterfallOutcome {
    let last = requirements.len().saturating_sub(1);
    let (final_state, months) = requirements.iter().enumerate().fold(
        (WaterfallState::default(), Vec::with_capacity(requirements.len())),
        |(state, mut months), (m, requirement)| {
            let (next, record) = step(stack, &state, m as Month, *requirement, m == last);
            months.push(record);
            (next, months)
        },
    );
    WaterfallOutcome {
        months,
        final_state,
    }
}

/// Advance the waterfall by one month.
///
/// Order within the month: interest on opening balances and facility fees,
/// interest on cash held, scheduled equity, then the draw or repayment of
/// the month's requirement (project need, cash finance costs and any carried
/// shortfall), then the terminal sweep when `terminal`.
pub fn step(
    stack: &CapitalStack,
    previous: &WaterfallState,
    month: Month,
    project_requirement: Money,
    terminal: bool,
) -> (WaterfallState, WaterfallMonth) {
    let mut state = previous.clone();
    let mut tier_months: [Option<TierMonth>; 2] = [None, None];
    let mut finance_costs = Decimal::ZERO;

    // Interest and fees
    for tier in [&stack.senior, &stack.mezzanine].into_iter().flatten() {
        let ts = state.tier_mut(tier.kind);
        let opening = ts.balance;
        let interest = to_cents(opening * tier.rate.rate_for(month) / dec!(12));
        let mut fees = to_cents(tier.monthly_line_fee(month));
        if month == tier.activation_month {
            fees += tier.establishment_fee;
        }

        let (capitalised, paid) = if tier.interest_capitalised {
            (interest, Decimal::ZERO)
        } else {
            (Decimal::ZERO, interest)
        };
        ts.balance += capitalised;
        ts.interest_total += interest;
        ts.capitalised_interest_total += capitalised;
        ts.fees_total += fees;
        finance_costs += paid + fees;

        tier_months[tier.kind.index()] = Some(TierMonth {
            opening_balance: opening,
            interest,
            interest_capitalised: capitalised,
            interest_paid: paid,
            fees,
            ..TierMonth::default()
        });
    }

    // Interest on cash held
    let surplus_interest = if state.cash > Decimal::ZERO {
        to_cents(state.cash * stack.surplus_funds_rate / dec!(12))
    } else {
        Decimal::ZERO
    };
    state.cash += surplus_interest;
    state.surplus_interest_total += surplus_interest;

    // Equity injected regardless of need
    let mut equity_injected = stack.equity.scheduled_injection(month);
    state.cash += equity_injected;

    let mut equity_distributed = Decimal::ZERO;
    let carried = state.unfunded;
    let need = project_requirement + finance_costs + carried;
    state.unfunded = Decimal::ZERO;

    if need > Decimal::ZERO {
        let (raised, remaining) = fund(stack, &mut state, &mut tier_months, month, need, carried);
        equity_injected += raised;
        if remaining > Decimal::ZERO {
            tracing::debug!(month, %remaining, "funding shortfall carried forward");
            state.unfunded = remaining;
        }
    } else if need < Decimal::ZERO {
        equity_distributed += apply_surplus(stack, &mut state, &mut tier_months, -need);
    }

    if terminal {
        equity_distributed += sweep(stack, &mut state, &mut tier_months);
        let debt = state.total_debt();
        if !debt.is_zero() || !state.unfunded.is_zero() {
            tracing::debug!(
                month,
                %debt,
                shortfall = %state.unfunded,
                "terminal month leaves debt or shortfall outstanding"
            );
        }
    }

    state.equity_injected_total += equity_injected;
    state.equity_distributed_total += equity_distributed;

    for tier in [&stack.senior, &stack.mezzanine].into_iter().flatten() {
        if let Some(tm) = tier_months[tier.kind.index()].as_mut() {
            tm.closing_balance = state.tier(tier.kind).balance;
        }
    }

    let record = WaterfallMonth {
        month,
        project_requirement,
        finance_costs_paid: finance_costs,
        surplus_interest,
        equity_injected,
        equity_distributed,
        senior: tier_months[TierKind::Senior.index()],
        mezzanine: tier_months[TierKind::Mezzanine.index()],
        cash_balance: state.cash,
        total_debt: state.total_debt(),
        funding_shortfall: state.unfunded,
    };
    (state, record)
}

/// Meet `need` from cash on hand, then equity and debt in funding order.
/// Returns equity raised this month and whatever could not be funded.
///
/// `carried` is the part of `need` left unfunded in earlier months. Cash
/// clears it first. Pari-passu equity has already paid its share of it, so
/// the share applies only to the rest.
fn fund(
    stack: &CapitalStack,
    state: &mut WaterfallState,
    tier_months: &mut [Option<TierMonth>; 2],
    month: Month,
    need: Money,
    carried: Money,
) -> (Money, Money) {
    let from_cash = state.cash.min(need);
    state.cash -= from_cash;
    let mut remaining = need - from_cash;
    let mut raised = Decimal::ZERO;

    if let EquityPlan::PariPassu { share } = stack.equity {
        let carried_left = (carried - from_cash).max(Decimal::ZERO);
        let fresh = (remaining - carried_left).max(Decimal::ZERO);
        let equity_part = to_cents(fresh * share);
        raised += equity_part;
        remaining -= equity_part;
    }

    for source in &stack.funding_order {
        if remaining <= Decimal::ZERO {
            break;
        }
        match source {
            FundingSource::Equity => {
                if let EquityPlan::Pool { commitment, .. } = stack.equity {
                    let take = (commitment - state.pool_drawn).max(Decimal::ZERO).min(remaining);
                    state.pool_drawn += take;
                    raised += take;
                    remaining -= take;
                }
            }
            FundingSource::Senior | FundingSource::Mezzanine => {
                let Some(tier) = source.tier().and_then(|k| stack.tier(k)) else {
                    continue;
                };
                remaining -= draw(tier, state, tier_months, month, remaining);
            }
        }
    }

    (raised, remaining)
}

fn draw(
    tier: &CapitalTier,
    state: &mut WaterfallState,
    tier_months: &mut [Option<TierMonth>; 2],
    month: Month,
    wanted: Money,
) -> Money {
    if !tier.is_active(month) {
        return Decimal::ZERO;
    }
    let ts = state.tier_mut(tier.kind);
    let headroom = (tier.limit - ts.balance).max(Decimal::ZERO);
    let take = headroom.min(wanted);
    ts.balance += take;
    ts.drawn_total += take;
    if let Some(tm) = tier_months[tier.kind.index()].as_mut() {
        tm.drawn += take;
    }
    take
}

fn repay(
    tier: &CapitalTier,
    state: &mut WaterfallState,
    tier_months: &mut [Option<TierMonth>; 2],
    available: Money,
) -> Money {
    let ts = state.tier_mut(tier.kind);
    let amount = ts.balance.min(available).max(Decimal::ZERO);
    ts.balance -= amount;
    ts.repaid_total += amount;
    if let Some(tm) = tier_months[tier.kind.index()].as_mut() {
        tm.repaid += amount;
    }
    amount
}

/// Apply a net surplus. Returns the amount distributed to equity.
fn apply_surplus(
    stack: &CapitalStack,
    state: &mut WaterfallState,
    tier_months: &mut [Option<TierMonth>; 2],
    surplus: Money,
) -> Money {
    let mut available = surplus;
    for tier in stack.repay_order() {
        if stack.surplus_policy == SurplusPolicy::RetainCash && tier.interest_capitalised {
            continue;
        }
        available -= repay(tier, state, tier_months, available);
    }

    match stack.surplus_policy {
        SurplusPolicy::RepayDebt => available,
        SurplusPolicy::RetainCash => {
            state.cash += available;
            Decimal::ZERO
        }
    }
}

/// Terminal month: clear debt from cash in repayment order and hand the rest
/// back to equity. Returns the amount distributed.
fn sweep(
    stack: &CapitalStack,
    state: &mut WaterfallState,
    tier_months: &mut [Option<TierMonth>; 2],
) -> Money {
    let mut available = state.cash;
    for tier in stack.repay_order() {
        available -= repay(tier, state, tier_months, available);
    }
    state.cash = Decimal::ZERO;
    available
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capital::stack::{
        default_funding_order, DatedRate, Instalment, PoolBasis, RateMode,
    };
    use rust_decimal_macros::dec;

    fn tier(kind: TierKind, limit: Money, rate: Decimal, capitalised: bool) -> CapitalTier {
        CapitalTier {
            kind,
            name: format!("{kind:?}"),
            rate: RateMode::Single { rate },
            line_fee_rate: Decimal::ZERO,
            establishment_fee: Decimal::ZERO,
            limit,
            activation_month: 0,
            interest_capitalised: capitalised,
        }
    }

    fn stack(equity: EquityPlan) -> CapitalStack {
        CapitalStack {
            senior: None,
            mezzanine: None,
            equity,
            funding_order: default_funding_order(),
            surplus_policy: SurplusPolicy::RepayDebt,
            surplus_funds_rate: Decimal::ZERO,
        }
    }

    #[test]
    fn test_shortfall_is_recorded_not_clipped() {
        let mut s = stack(EquityPlan::LumpSum { amount: Decimal::ZERO });
        s.senior = Some(tier(TierKind::Senior, dec!(400000), Decimal::ZERO, true));
        let out = run_waterfall(&s, &[dec!(500000), dec!(0)]);
        let m0 = &out.months[0];
        assert_eq!(m0.senior.unwrap().drawn, dec!(400000));
        assert_eq!(m0.funding_shortfall, dec!(100000));
        // Carried, not forgiven
        assert_eq!(out.months[1].funding_shortfall, dec!(100000));
    }

    #[test]
    fn test_draw_priority_equity_senior_mezzanine() {
        let mut s = stack(EquityPlan::LumpSum { amount: dec!(100) });
        s.senior = Some(tier(TierKind::Senior, dec!(200), Decimal::ZERO, true));
        s.mezzanine = Some(tier(TierKind::Mezzanine, dec!(300), Decimal::ZERO, true));
        let out = run_waterfall(&s, &[dec!(450), dec!(0)]);
        let m0 = &out.months[0];
        assert_eq!(m0.equity_injected, dec!(100));
        assert_eq!(m0.senior.unwrap().drawn, dec!(200));
        assert_eq!(m0.mezzanine.unwrap().drawn, dec!(150));
        assert_eq!(m0.funding_shortfall, Decimal::ZERO);
    }

    #[test]
    fn test_senior_not_drawn_before_activation() {
        let mut s = stack(EquityPlan::LumpSum { amount: Decimal::ZERO });
        let mut senior = tier(TierKind::Senior, dec!(1000), Decimal::ZERO, true);
        senior.activation_month = 1;
        s.senior = Some(senior);
        let out = run_waterfall(&s, &[dec!(100), dec!(50), dec!(0)]);
        assert_eq!(out.months[0].funding_shortfall, dec!(100));
        // Carried shortfall funded once the facility opens
        assert_eq!(out.months[1].senior.unwrap().drawn, dec!(150));
        assert_eq!(out.months[1].funding_shortfall, Decimal::ZERO);
    }

    #[test]
    fn test_capitalised_interest_grows_balance() {
        let mut s = stack(EquityPlan::LumpSum { amount: Decimal::ZERO });
        s.senior = Some(tier(TierKind::Senior, dec!(1000000), dec!(0.12), true));
        let out = run_waterfall(&s, &[dec!(100000), dec!(0), dec!(0)]);
        let m1 = out.months[1].senior.unwrap();
        assert_eq!(m1.interest, dec!(1000));
        assert_eq!(m1.interest_capitalised, dec!(1000));
        assert_eq!(m1.closing_balance, dec!(101000));
        assert_eq!(out.months[1].finance_costs_paid, Decimal::ZERO);
    }

    #[test]
    fn test_cash_interest_funded_through_waterfall() {
        let mut s = stack(EquityPlan::LumpSum { amount: Decimal::ZERO });
        s.senior = Some(tier(TierKind::Senior, dec!(1000000), dec!(0.12), false));
        let out = run_waterfall(&s, &[dec!(100000), dec!(0), dec!(0)]);
        let m1 = out.months[1].senior.unwrap();
        assert_eq!(m1.interest_paid, dec!(1000));
        // Interest paid by drawing further on the same facility
        assert_eq!(m1.drawn, dec!(1000));
        assert_eq!(out.months[1].finance_costs_paid, dec!(1000));
    }

    #[test]
    fn test_surplus_repays_mezzanine_first() {
        let mut s = stack(EquityPlan::LumpSum { amount: Decimal::ZERO });
        s.senior = Some(tier(TierKind::Senior, dec!(100), Decimal::ZERO, true));
        s.mezzanine = Some(tier(TierKind::Mezzanine, dec!(100), Decimal::ZERO, true));
        let out = run_waterfall(&s, &[dec!(150), dec!(-60), dec!(-200)]);
        let m1 = &out.months[1];
        assert_eq!(m1.mezzanine.unwrap().repaid, dec!(50));
        assert_eq!(m1.senior.unwrap().repaid, dec!(10));
        let m2 = &out.months[2];
        assert_eq!(m2.senior.unwrap().repaid, dec!(90));
        assert_eq!(m2.equity_distributed, dec!(110));
        assert_eq!(out.final_state.total_debt(), Decimal::ZERO);
    }

    #[test]
    fn test_retain_cash_skips_capitalised_tier_and_earns_interest() {
        let mut s = stack(EquityPlan::LumpSum { amount: Decimal::ZERO });
        s.senior = Some(tier(TierKind::Senior, dec!(1000), Decimal::ZERO, true));
        s.surplus_policy = SurplusPolicy::RetainCash;
        s.surplus_funds_rate = dec!(0.12);
        let out = run_waterfall(&s, &[dec!(1000), dec!(-1000), dec!(0)]);
        assert_eq!(out.months[1].senior.unwrap().repaid, Decimal::ZERO);
        assert_eq!(out.months[1].cash_balance, dec!(1000));
        // 1% a month on 1,000 held, then swept at the end
        assert_eq!(out.months[2].surplus_interest, dec!(10));
        assert_eq!(out.months[2].senior.unwrap().repaid, dec!(1000));
        assert_eq!(out.months[2].equity_distributed, dec!(10));
        assert_eq!(out.final_state.cash, Decimal::ZERO);
    }

    #[test]
    fn test_surplus_clears_carried_shortfall_first() {
        let s = stack(EquityPlan::LumpSum { amount: Decimal::ZERO });
        let out = run_waterfall(&s, &[dec!(100), dec!(-150), dec!(0)]);
        assert_eq!(out.months[0].funding_shortfall, dec!(100));
        assert_eq!(out.months[1].funding_shortfall, Decimal::ZERO);
        assert_eq!(out.months[1].equity_distributed, dec!(50));
    }

    #[test]
    fn test_lump_sum_is_a_pool_returned_at_end() {
        let s = stack(EquityPlan::LumpSum { amount: dec!(1000) });
        let out = run_waterfall(&s, &[dec!(300), dec!(200), dec!(0)]);
        assert_eq!(out.months[0].equity_injected, dec!(1000));
        assert_eq!(out.months[1].cash_balance, dec!(500));
        assert_eq!(out.months[2].equity_distributed, dec!(500));
    }

    #[test]
    fn test_instalments_inject_regardless_of_need() {
        let s = stack(EquityPlan::Instalments {
            schedule: vec![
                Instalment {
                    month: 0,
                    amount: dec!(100),
                },
                Instalment {
                    month: 2,
                    amount: dec!(100),
                },
            ],
        });
        let out = run_waterfall(&s, &[dec!(0), dec!(0), dec!(0), dec!(0)]);
        assert_eq!(out.months[2].equity_injected, dec!(100));
        assert_eq!(out.final_state.equity_injected_total, dec!(200));
        assert_eq!(out.months[3].equity_distributed, dec!(200));
    }

    #[test]
    fn test_pool_draws_only_to_commitment() {
        let mut s = stack(EquityPlan::Pool {
            commitment: dec!(250),
            basis: PoolBasis::PercentOfLand,
        });
        s.senior = Some(tier(TierKind::Senior, dec!(1000), Decimal::ZERO, true));
        let out = run_waterfall(&s, &[dec!(200), dec!(200), dec!(0)]);
        assert_eq!(out.months[0].equity_injected, dec!(200));
        assert_eq!(out.months[1].equity_injected, dec!(50));
        assert_eq!(out.months[1].senior.unwrap().drawn, dec!(150));
    }

    #[test]
    fn test_pari_passu_recomputed_each_month() {
        let mut s = stack(EquityPlan::PariPassu { share: dec!(0.3) });
        s.senior = Some(tier(TierKind::Senior, dec!(10000), Decimal::ZERO, true));
        let out = run_waterfall(&s, &[dec!(1000), dec!(500), dec!(0)]);
        assert_eq!(out.months[0].equity_injected, dec!(300));
        assert_eq!(out.months[0].senior.unwrap().drawn, dec!(700));
        assert_eq!(out.months[1].equity_injected, dec!(150));
        assert_eq!(out.months[1].senior.unwrap().drawn, dec!(350));
    }

    #[test]
    fn test_pari_passu_share_holds_while_debt_is_closed() {
        let mut s = stack(EquityPlan::PariPassu { share: dec!(0.3) });
        let mut senior = tier(TierKind::Senior, dec!(100000), Decimal::ZERO, true);
        senior.activation_month = 3;
        s.senior = Some(senior);
        let out = run_waterfall(&s, &[dec!(1000), dec!(1000), dec!(1000), dec!(0), dec!(0)]);

        for m in 0..3 {
            assert_eq!(out.months[m].equity_injected, dec!(300), "month {m}");
        }
        assert_eq!(out.months[2].funding_shortfall, dec!(2100));
        // The carried debt share goes to debt once the facility opens
        assert_eq!(out.months[3].equity_injected, Decimal::ZERO);
        assert_eq!(out.months[3].senior.unwrap().drawn, dec!(2100));
        assert_eq!(out.months[3].funding_shortfall, Decimal::ZERO);
        assert_eq!(out.final_state.equity_injected_total, dec!(900));
        assert_eq!(out.final_state.tier(TierKind::Senior).drawn_total, dec!(2100));
    }

    #[test]
    fn test_pari_passu_carried_shortfall_alongside_new_need() {
        let mut s = stack(EquityPlan::PariPassu { share: dec!(0.5) });
        let mut senior = tier(TierKind::Senior, dec!(100000), Decimal::ZERO, true);
        senior.activation_month = 1;
        s.senior = Some(senior);
        let out = run_waterfall(&s, &[dec!(400), dec!(200), dec!(0)]);
        assert_eq!(out.months[0].equity_injected, dec!(200));
        assert_eq!(out.months[0].funding_shortfall, dec!(200));
        // Half of the new 200 from equity; the rest plus the carried 200 from debt
        assert_eq!(out.months[1].equity_injected, dec!(100));
        assert_eq!(out.months[1].senior.unwrap().drawn, dec!(300));
    }

    #[test]
    fn test_variable_rate_applies_from_its_month() {
        let mut s = stack(EquityPlan::LumpSum { amount: Decimal::ZERO });
        let mut senior = tier(TierKind::Senior, dec!(1000000), Decimal::ZERO, true);
        senior.rate = RateMode::Variable {
            schedule: vec![
                DatedRate {
                    month: 0,
                    rate: dec!(0.12),
                },
                DatedRate {
                    month: 2,
                    rate: dec!(0.24),
                },
            ],
        };
        s.senior = Some(senior);
        let out = run_waterfall(&s, &[dec!(100000), dec!(0), dec!(0), dec!(0)]);
        let interest: Vec<Money> = out
            .months
            .iter()
            .map(|m| m.senior.unwrap().interest)
            .collect();
        // 1% a month on 100,000, then 2% a month on the capitalised balance
        assert_eq!(interest[0], Decimal::ZERO);
        assert_eq!(interest[1], dec!(1000));
        assert_eq!(interest[2], dec!(2020));
        assert_eq!(interest[3], dec!(2060.40));
        assert_eq!(out.months[3].senior.unwrap().closing_balance, dec!(105080.40));
    }

    #[test]
    fn test_fees_charged_from_activation() {
        let mut s = stack(EquityPlan::LumpSum { amount: dec!(10000) });
        let mut senior = tier(TierKind::Senior, dec!(120000), Decimal::ZERO, true);
        senior.activation_month = 1;
        senior.establishment_fee = dec!(500);
        senior.line_fee_rate = dec!(0.01);
        s.senior = Some(senior);
        let out = run_waterfall(&s, &[dec!(0), dec!(0), dec!(0)]);
        assert_eq!(out.months[0].senior.unwrap().fees, Decimal::ZERO);
        assert_eq!(out.months[1].senior.unwrap().fees, dec!(600));
        assert_eq!(out.months[2].senior.unwrap().fees, dec!(100));
        assert_eq!(out.months[2].finance_costs_paid, dec!(100));
    }

    #[test]
    fn test_terminal_debt_reported_not_forced_to_zero() {
        let mut s = stack(EquityPlan::LumpSum { amount: Decimal::ZERO });
        s.senior = Some(tier(TierKind::Senior, dec!(1000), Decimal::ZERO, true));
        let out = run_waterfall(&s, &[dec!(800), dec!(-300)]);
        assert_eq!(out.final_state.total_debt(), dec!(500));
        assert_eq!(out.months[1].total_debt, dec!(500));
    }

    #[test]
    fn test_step_does_not_mutate_previous_state() {
        let s = stack(EquityPlan::LumpSum { amount: dec!(100) });
        let initial = WaterfallState::default();
        let (next, _) = step(&s, &initial, 0, dec!(40), false);
        assert_eq!(initial, WaterfallState::default());
        assert_eq!(next.cash, dec!(60));
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::schedule::distribution::settle_to_cents;
use crate::types::{to_cents, Money, Rate};

/// GST treatment of a cost or revenue line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GstTreatment {
    /// Price includes GST; costs carry a fully creditable input tax credit
    #[default]
    Taxable,
    /// No GST component
    #[serde(alias = "Exempt")]
    GstFree,
    /// GST on the margin over an acquisition cost basis (sales only)
    MarginScheme,
}

/// Split of a GST-inclusive gross amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GstSplit {
    pub net_of_gst: Money,
    pub gst_component: Money,
    pub input_tax_credit: Money,
}

impl GstSplit {
    fn from_gst(gross: Money, gst: Money, creditable: bool) -> Self {
        GstSplit {
            net_of_gst: gross - gst,
            gst_component: gst,
            input_tax_credit: if creditable { gst } else { Decimal::ZERO },
        }
    }
}

/// GST inside a GST-inclusive amount: `amount * rate / (1 + rate)`, in cents.
pub fn gst_inclusive_component(amount: Money, rate: Rate) -> Money {
    to_cents(amount * rate / (Decimal::ONE + rate))
}

/// Cost-side split. Only taxable costs carry GST, all of it creditable.
/// The margin scheme changes revenue-side GST only.
pub fn split_cost(gross: Money, treatment: GstTreatment, rate: Rate) -> GstSplit {
    match treatment {
        GstTreatment::Taxable => {
            GstSplit::from_gst(gross, gst_inclusive_component(gross, rate), true)
        }
        GstTreatment::GstFree | GstTreatment::MarginScheme => {
            GstSplit::from_gst(gross, Decimal::ZERO, false)
        }
    }
}

/// Revenue-side split. Under the margin scheme GST is payable on the uplift
/// over `margin_basis`, never below zero.
pub fn split_revenue(
    gross: Money,
    treatment: GstTreatment,
    rate: Rate,
    margin_basis: Money,
) -> GstSplit {
    match treatment {
        GstTreatment::Taxable => {
            GstSplit::from_gst(gross, gst_inclusive_component(gross, rate), false)
        }
        GstTreatment::GstFree => GstSplit::from_gst(gross, Decimal::ZERO, false),
        GstTreatment::MarginScheme => {
            let margin = (gross - margin_basis).max(Decimal::ZERO);
            GstSplit::from_gst(gross, gst_inclusive_component(margin, rate), false)
        }
    }
}

/// Per-month GST split of one line item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GstSeries {
    pub net: Vec<Money>,
    pub gst: Vec<Money>,
    pub itc: Vec<Money>,
    pub total: GstSplit,
}

/// Spread an item-level split across its gross monthly series in proportion
/// to each month's gross. Rounding residuals land in the item's last non-zero
/// month, so `net + gst == gross` holds per month and for the item.
pub fn apportion(gross_series: &[Money], total: GstSplit) -> GstSeries {
    let gross_total: Money = gross_series.iter().copied().sum();
    let share = |amount: Money| -> Vec<Money> {
        if gross_total.is_zero() || amount.is_zero() {
            return vec![Decimal::ZERO; gross_series.len()];
        }
        let raw: Vec<Money> = gross_series
            .iter()
            .map(|g| *g * amount / gross_total)
            .collect();
        settle_to_cents(&raw, amount)
    };

    let gst = share(total.gst_component);
    let itc = if total.input_tax_credit == total.gst_component {
        gst.clone()
    } else {
        share(total.input_tax_credit)
    };
    let net = gross_series
        .iter()
        .zip(&gst)
        .map(|(g, t)| *g - *t)
        .collect();

    GstSeries {
        net,
        gst,
        itc,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RATE: Decimal = dec!(0.10);

    #[test]
    fn test_taxable_cost_fully_creditable() {
        let split = split_cost(dec!(110000), GstTreatment::Taxable, RATE);
        assert_eq!(split.gst_component, dec!(10000));
        assert_eq!(split.input_tax_credit, dec!(10000));
        assert_eq!(split.net_of_gst, dec!(100000));
    }

    #[test]
    fn test_gst_free_cost() {
        let split = split_cost(dec!(5000), GstTreatment::GstFree, RATE);
        assert_eq!(split.gst_component, Decimal::ZERO);
        assert_eq!(split.net_of_gst, dec!(5000));
    }

    #[test]
    fn test_margin_scheme_cost_has_no_itc() {
        let split = split_cost(dec!(5000), GstTreatment::MarginScheme, RATE);
        assert_eq!(split.input_tax_credit, Decimal::ZERO);
    }

    #[test]
    fn test_margin_scheme_sale_taxes_uplift_only() {
        let split = split_revenue(dec!(1000000), GstTreatment::MarginScheme, RATE, dec!(450000));
        assert_eq!(split.gst_component, dec!(50000));
        assert_eq!(split.input_tax_credit, Decimal::ZERO);
        assert_eq!(split.net_of_gst, dec!(950000));
    }

    #[test]
    fn test_margin_scheme_loss_pays_nothing() {
        let split = split_revenue(dec!(300000), GstTreatment::MarginScheme, RATE, dec!(450000));
        assert_eq!(split.gst_component, Decimal::ZERO);
    }

    #[test]
    fn test_gst_identity_on_awkward_amounts() {
        for gross in [dec!(0.01), dec!(1.07), dec!(333.33), dec!(99999.99), dec!(-2500.05)] {
            let split = split_cost(gross, GstTreatment::Taxable, RATE);
            assert_eq!(split.net_of_gst + split.gst_component, gross);
        }
    }

    #[test]
    fn test_apportion_preserves_identity_per_month() {
        let gross = vec![dec!(0), dec!(333.33), dec!(333.33), dec!(333.34)];
        let total = split_cost(dec!(1000), GstTreatment::Taxable, RATE);
        let series = apportion(&gross, total);
        for i in 0..gross.len() {
            assert_eq!(series.net[i] + series.gst[i], gross[i]);
        }
        assert_eq!(series.gst.iter().copied().sum::<Decimal>(), total.gst_component);
        assert_eq!(series.itc, series.gst);
        assert_eq!(series.gst[0], Decimal::ZERO);
    }
}

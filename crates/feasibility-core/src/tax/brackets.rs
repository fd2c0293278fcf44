use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::FeasibilityError;
use crate::types::{ratio, to_cents, with_metadata, ComputationOutput, Money, Rate};
use crate::FeasibilityResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    NSW,
    VIC,
    QLD,
    SA,
    WA,
    TAS,
    ACT,
    NT,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaxKind {
    StampDuty,
    LandTaxGeneral,
    LandTaxTrust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketMethod {
    /// Marginal: rate applies to the slice above the bracket's lower bound,
    /// on top of the lower brackets' cumulative duty
    Sliding,
    /// Rate applies to the whole value once the bracket is reached
    Flat,
}

/// One bracket of a progressive schedule.
///
/// `limit` is the exclusive ceiling. The last bracket is open ended and its
/// limit is not used for lookup. A non-zero `base` replaces the duty
/// accumulated by lower brackets (sliding) or is the fixed component (flat).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub limit: Money,
    pub rate: Rate,
    #[serde(default)]
    pub base: Money,
    pub method: BracketMethod,
}

/// Brackets for one jurisdiction and tax kind, as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSchedule {
    pub jurisdiction: Jurisdiction,
    pub kind: TaxKind,
    pub brackets: Vec<TaxBracket>,
}

/// Validated lookup of bracket schedules. Construction rejects malformed
/// schedules, so lookups never fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaxSchedule>", into = "Vec<TaxSchedule>")]
pub struct TaxTable {
    schedules: BTreeMap<(Jurisdiction, TaxKind), Vec<TaxBracket>>,
}

impl TaxTable {
    pub fn new(schedules: Vec<TaxSchedule>) -> FeasibilityResult<Self> {
        let mut map = BTreeMap::new();
        for schedule in schedules {
            validate_brackets(&schedule.brackets, &schedule.jurisdiction, schedule.kind)?;
            let key = (schedule.jurisdiction, schedule.kind);
            if map.contains_key(&key) {
                return Err(FeasibilityError::config(
                    "tax_table",
                    format!("duplicate schedule for {:?} {:?}", key.0, key.1),
                ));
            }
            map.insert(key, schedule.brackets);
        }
        Ok(TaxTable { schedules: map })
    }

    pub fn brackets(&self, jurisdiction: &Jurisdiction, kind: TaxKind) -> &[TaxBracket] {
        self.schedules
            .get(&(jurisdiction.clone(), kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tax payable on `value`. Zero when no schedule is configured.
    pub fn resolve(&self, jurisdiction: &Jurisdiction, kind: TaxKind, value: Money) -> Money {
        resolve_brackets(self.brackets(jurisdiction, kind), value).payable
    }
}

impl TryFrom<Vec<TaxSchedule>> for TaxTable {
    type Error = FeasibilityError;

    fn try_from(schedules: Vec<TaxSchedule>) -> Result<Self, Self::Error> {
        TaxTable::new(schedules)
    }
}

impl From<TaxTable> for Vec<TaxSchedule> {
    fn from(table: TaxTable) -> Self {
        table
            .schedules
            .into_iter()
            .map(|((jurisdiction, kind), brackets)| TaxSchedule {
                jurisdiction,
                kind,
                brackets,
            })
            .collect()
    }
}

/// Payable amount and the bracket that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketResolution {
    pub payable: Money,
    /// Index of the bracket containing the value; `None` when nothing applies
    pub bracket_index: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// `resolve(table, jurisdiction, kind, value)`.
pub fn resolve(table: &TaxTable, jurisdiction: &Jurisdiction, kind: TaxKind, value: Money) -> Money {
    table.resolve(jurisdiction, kind, value)
}

/// Scan brackets in ascending order and price `value` in the bracket that
/// contains it.
pub fn resolve_brackets(brackets: &[TaxBracket], value: Money) -> BracketResolution {
    if brackets.is_empty() || value <= Decimal::ZERO {
        return BracketResolution {
            payable: Decimal::ZERO,
            bracket_index: None,
        };
    }

    let last = brackets.len() - 1;
    let mut lower = Decimal::ZERO;
    let mut accumulated = Decimal::ZERO;

    for (i, bracket) in brackets.iter().enumerate() {
        if i == last || value < bracket.limit {
            let payable = match bracket.method {
                BracketMethod::Sliding => {
                    anchor(bracket, accumulated) + (value - lower) * bracket.rate
                }
                BracketMethod::Flat => bracket.base + value * bracket.rate,
            };
            return BracketResolution {
                payable: to_cents(payable),
                bracket_index: Some(i),
            };
        }

        // Value is above this bracket: carry the duty at its ceiling upward
        accumulated = match bracket.method {
            BracketMethod::Sliding => {
                anchor(bracket, accumulated) + (bracket.limit - lower) * bracket.rate
            }
            BracketMethod::Flat => bracket.base + bracket.limit * bracket.rate,
        };
        lower = bracket.limit;
    }

    BracketResolution {
        payable: Decimal::ZERO,
        bracket_index: None,
    }
}

fn anchor(bracket: &TaxBracket, accumulated: Money) -> Money {
    if bracket.base.is_zero() {
        accumulated
    } else {
        bracket.base
    }
}

fn validate_brackets(
    brackets: &[TaxBracket],
    jurisdiction: &Jurisdiction,
    kind: TaxKind,
) -> FeasibilityResult<()> {
    let field = |i: usize| format!("tax_table[{jurisdiction:?}/{kind:?}].brackets[{i}]");
    let last = brackets.len().saturating_sub(1);

    for (i, bracket) in brackets.iter().enumerate() {
        if bracket.rate < Decimal::ZERO {
            return Err(FeasibilityError::config(field(i), "rate must not be negative"));
        }
        if bracket.base < Decimal::ZERO {
            return Err(FeasibilityError::config(field(i), "base must not be negative"));
        }
        if bracket.limit < Decimal::ZERO {
            return Err(FeasibilityError::config(field(i), "limit must not be negative"));
        }
        if i == 0 {
            continue;
        }
        // An open-ended final bracket may leave its limit at zero
        let open_top = i == last && bracket.limit.is_zero();
        if !open_top && bracket.limit <= brackets[i - 1].limit {
            return Err(FeasibilityError::config(
                field(i),
                format!(
                    "limits must be strictly ascending ({} follows {})",
                    bracket.limit,
                    brackets[i - 1].limit
                ),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Standalone entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxInput {
    pub table: TaxTable,
    pub jurisdiction: Jurisdiction,
    pub kind: TaxKind,
    pub dutiable_value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxOutput {
    pub payable: Money,
    /// payable / dutiable value; `None` for a zero value
    pub effective_rate: Option<Rate>,
    pub bracket_index: Option<usize>,
    pub method: Option<BracketMethod>,
}

pub fn calculate_tax(input: &TaxInput) -> FeasibilityResult<ComputationOutput<TaxOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    if input.dutiable_value < Decimal::ZERO {
        return Err(FeasibilityError::config(
            "dutiable_value",
            "must not be negative",
        ));
    }

    let brackets = input.table.brackets(&input.jurisdiction, input.kind);
    if brackets.is_empty() {
        warnings.push(format!(
            "No {:?} schedule configured for {:?}; nothing payable",
            input.kind, input.jurisdiction
        ));
    }
    let resolution = resolve_brackets(brackets, input.dutiable_value);

    let output = TaxOutput {
        payable: resolution.payable,
        effective_rate: ratio(resolution.payable, input.dutiable_value),
        method: resolution.bracket_index.map(|i| brackets[i].method),
        bracket_index: resolution.bracket_index,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Progressive bracket resolution (sliding / flat)",
        &serde_json::json!({
            "jurisdiction": input.jurisdiction,
            "kind": input.kind,
            "dutiable_value": input.dutiable_value.to_string(),
            "brackets": brackets.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

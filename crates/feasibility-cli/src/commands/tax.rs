use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use feasibility_core::tax::brackets::{calculate_tax, TaxInput};

use crate::input;

/// Arguments for a single bracket lookup
#[derive(Args)]
pub struct TaxArgs {
    /// Path to a JSON or YAML TaxInput file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a tax table file (list of jurisdiction schedules)
    #[arg(long)]
    pub table: Option<String>,

    /// Jurisdiction code, e.g. NSW
    #[arg(long)]
    pub jurisdiction: Option<String>,

    /// StampDuty, LandTaxGeneral or LandTaxTrust
    #[arg(long, default_value = "StampDuty")]
    pub kind: String,

    /// Dutiable or assessed value
    #[arg(long)]
    pub value: Option<Decimal>,
}

pub fn run_tax(args: TaxArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let tax_input: TaxInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let table = input::file::read_value(
            args.table
                .as_deref()
                .ok_or("--table is required (or provide --input)")?,
        )?;
        let jurisdiction = args
            .jurisdiction
            .ok_or("--jurisdiction is required (or provide --input)")?;
        let value = args.value.ok_or("--value is required (or provide --input)")?;

        serde_json::from_value(serde_json::json!({
            "table": table,
            "jurisdiction": jurisdiction,
            "kind": args.kind,
            "dutiable_value": value.to_string(),
        }))?
    };

    let result = calculate_tax(&tax_input)?;
    Ok(serde_json::to_value(result)?)
}

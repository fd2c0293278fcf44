use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use feasibility_core::time_value::{calculate_dcf, DcfInput};

use crate::input;

/// Arguments for NPV / IRR of a cash flow series
#[derive(Args)]
pub struct DcfArgs {
    /// Path to a JSON or YAML DcfInput file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Periodic cash flows (comma-separated, e.g. "-1000000,0,0,0,1300000")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Annual discount rate (decimal)
    #[arg(long, default_value = "0.1")]
    pub discount_rate: Decimal,

    /// Periods per year in the series
    #[arg(long, default_value_t = 12)]
    pub periods_per_year: u32,
}

pub fn run_dcf(args: DcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dcf_input: DcfInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        DcfInput {
            cash_flows: args
                .cash_flows
                .ok_or("--cash-flows is required (or provide --input)")?,
            annual_discount_rate: args.discount_rate,
            periods_per_year: args.periods_per_year,
        }
    };

    let result = calculate_dcf(&dcf_input)?;
    Ok(serde_json::to_value(result)?)
}

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use feasibility_core::schedule::distribution::{distribute_amount, DistributionInput};

use crate::input;

/// Arguments for spreading one amount over the horizon
#[derive(Args)]
pub struct DistributeArgs {
    /// Path to a JSON or YAML DistributionInput file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount to distribute
    #[arg(long, allow_hyphen_values = true)]
    pub amount: Option<Decimal>,

    /// First month of the span
    #[arg(long, default_value_t = 0)]
    pub start_month: u32,

    /// Number of months in the span
    #[arg(long, default_value_t = 1)]
    pub span: u32,

    /// Upfront, Linear or SCurve
    #[arg(long, default_value = "Linear")]
    pub method: String,

    /// Annual escalation rate (decimal: 0.03 = 3%)
    #[arg(long, default_value = "0")]
    pub escalation: Decimal,

    /// Project horizon in months
    #[arg(long)]
    pub duration: Option<u32>,
}

pub fn run_distribute(args: DistributeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dist_input: DistributionInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let amount = args.amount.ok_or("--amount is required (or provide --input)")?;
        let duration = args
            .duration
            .ok_or("--duration is required (or provide --input)")?;
        serde_json::from_value(serde_json::json!({
            "amount": amount.to_string(),
            "start_month": args.start_month,
            "span": args.span,
            "method": args.method,
            "escalation_rate": args.escalation.to_string(),
            "duration": duration,
        }))?
    };

    let result = distribute_amount(&dist_input)?;
    Ok(serde_json::to_value(result)?)
}

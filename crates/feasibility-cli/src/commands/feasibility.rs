use clap::{Args, ValueEnum};
use serde_json::Value;

use feasibility_core::feasibility::{run_feasibility, seed_budget, ScenarioInput};

use crate::input;

/// Which part of the feasibility result to print
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum View {
    /// Headline figures
    #[default]
    Summary,
    /// One row per project month
    Months,
    /// Totals per cost and revenue line
    Lines,
    /// Totals per cost category
    Categories,
    /// Opening budget seeded from cost lines
    Budget,
    /// Everything, including the metadata envelope
    Full,
}

/// Arguments for a full feasibility run
#[derive(Args)]
pub struct FeasibilityArgs {
    /// Path to a JSON or YAML scenario file
    #[arg(long)]
    pub input: Option<String>,

    /// Section of the result to print
    #[arg(long, value_enum, default_value_t = View::Summary)]
    pub view: View,
}

pub fn run_feasibility_cmd(args: FeasibilityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: ScenarioInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <scenario.json|yaml> or stdin required for a feasibility run".into());
    };

    let output = run_feasibility(&scenario)?;
    let result = &output.result;

    let section = match args.view {
        View::Full => return Ok(serde_json::to_value(&output)?),
        View::Summary => serde_json::to_value(&result.summary)?,
        View::Months => serde_json::to_value(&result.months)?,
        View::Lines => serde_json::to_value(&result.line_items)?,
        View::Categories => serde_json::to_value(&result.category_totals)?,
        View::Budget => serde_json::to_value(seed_budget(&result.line_items))?,
    };

    Ok(serde_json::json!({
        "result": section,
        "methodology": output.methodology,
        "warnings": output.warnings,
    }))
}

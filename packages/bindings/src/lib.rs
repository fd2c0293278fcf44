use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use feasibility_core::feasibility::{self, LineItemTotal, ScenarioInput, ScenarioUpdate};
use feasibility_core::FeasibilityResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse `input_json`, run `f` and serialise its output.
fn call_json<I, O>(input_json: &str, f: impl FnOnce(&I) -> FeasibilityResult<O>) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = f(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[napi]
pub fn run_feasibility(input_json: String) -> NapiResult<String> {
    call_json(&input_json, |input: &ScenarioInput| {
        feasibility::run_feasibility(input)
    })
}

/// The scenario with every default filled in, as the engine sees it.
#[napi]
pub fn resolve_scenario(input_json: String) -> NapiResult<String> {
    call_json(&input_json, |input: &ScenarioInput| {
        feasibility::resolve_scenario(input)
    })
}

#[napi]
pub fn apply_update(scenario_json: String, update_json: String) -> NapiResult<String> {
    let update: ScenarioUpdate = serde_json::from_str(&update_json).map_err(to_napi_error)?;
    call_json(&scenario_json, |scenario: &ScenarioInput| {
        feasibility::apply_update(scenario, update)
    })
}

#[napi]
pub fn seed_budget(line_items_json: String) -> NapiResult<String> {
    call_json(&line_items_json, |lines: &Vec<LineItemTotal>| {
        Ok(feasibility::seed_budget(lines))
    })
}

// ---------------------------------------------------------------------------
// Standalone calculations
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_tax(input_json: String) -> NapiResult<String> {
    call_json(&input_json, feasibility_core::tax::brackets::calculate_tax)
}

#[napi]
pub fn distribute_amount(input_json: String) -> NapiResult<String> {
    call_json(
        &input_json,
        feasibility_core::schedule::distribution::distribute_amount,
    )
}

#[napi]
pub fn calculate_dcf(input_json: String) -> NapiResult<String> {
    call_json(&input_json, feasibility_core::time_value::calculate_dcf)
}

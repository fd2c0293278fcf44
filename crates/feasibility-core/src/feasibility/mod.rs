//! Monthly feasibility simulation: scenario resolution, cashflow assembly,
//! the capital waterfall and summary analytics.

pub mod cashflow;
pub mod engine;
pub mod scenario;
pub mod summary;
pub mod update;

pub use engine::{run_feasibility, simulate, FeasibilityOutput, MonthlyCashflowRecord, TierAmounts};
pub use scenario::{resolve_scenario, ResolvedScenario, ScenarioInput};
pub use summary::{seed_budget, BudgetLine, CategoryTotal, FeasibilitySummary, LineItemTotal};
pub use update::{apply_update, ScenarioUpdate};

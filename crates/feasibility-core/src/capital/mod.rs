pub mod stack;
pub mod waterfall;

pub use stack::{
    CapitalStack, CapitalTier, DatedRate, EquityPlan, FundingSource, Instalment, PoolBasis,
    RateMode, SurplusPolicy, TierKind,
};
pub use waterfall::{run_waterfall, step, TierMonth, WaterfallMonth, WaterfallOutcome, WaterfallState};

//! Property development feasibility engine.
//!
//! Spreads timed costs and revenues over a monthly project timeline, runs the
//! capital stack (equity, senior and mezzanine debt) through a month-by-month
//! waterfall, resolves jurisdictional transaction taxes and derives profit,
//! margin, IRR and NPV. Every computation is pure and deterministic.

pub mod error;
pub mod schedule;
pub mod time_value;
pub mod types;

#[cfg(feature = "tax")]
pub mod tax;

#[cfg(feature = "capital")]
pub mod capital;

#[cfg(feature = "feasibility")]
pub mod feasibility;

pub use error::FeasibilityError;
pub use types::*;

/// Standard result type for all feasibility operations
pub type FeasibilityResult<T> = Result<T, FeasibilityError>;

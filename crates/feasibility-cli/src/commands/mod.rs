pub mod dcf;
pub mod distribute;
pub mod feasibility;
pub mod tax;

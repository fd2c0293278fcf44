pub mod distribution;

pub use distribution::{distribute, DistributionMethod, Distribution};

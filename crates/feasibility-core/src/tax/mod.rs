pub mod brackets;
pub mod gst;

pub use brackets::{resolve, BracketMethod, Jurisdiction, TaxBracket, TaxKind, TaxSchedule, TaxTable};
pub use gst::{GstSplit, GstTreatment};

//! Per-representation combiners. The assembler picks one per dataset.

mod event;
mod histogram;

pub use event::{CombinedEvents, combine_events};
pub use histogram::combine_histograms;

//! Describe module - renders objects as canonical field maps used for
//! comparison, filtering and reporting.

mod describer;

pub use describer::*;

//! Commit module - committing the candidate configuration with bounded polling.

mod poll;

pub use poll::*;

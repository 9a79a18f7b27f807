//! Position module - top/bottom/before/after placement of rules among their siblings.

mod manager;

pub use manager::*;

//! Store module - the remote object store seam and an in-memory implementation.

mod memory;
mod traits;

pub use memory::*;
pub use traits::*;

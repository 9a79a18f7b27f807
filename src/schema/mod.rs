//! Schema module describes each object type's fields, value kinds, defaults,
//! exclusive preset values and enable flag.
//!
//! The engine consults a Schema instead of inspecting objects at runtime.

mod elements;

pub use elements::*;

//! Value module - field values of managed objects and their canonical field maps.

mod value;

pub use value::*;

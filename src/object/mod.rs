//! Object module - managed objects, desired objects and current listings.

mod managed;

pub use managed::*;

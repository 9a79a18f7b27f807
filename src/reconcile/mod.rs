//! Reconcile module - bringing remote objects to a desired state.
//!
//! A Reconciler takes one request (scope, object type, verb, desired object)
//! and decides, against a freshly fetched listing, which create, update,
//! delete or move calls the store needs.

mod merge;
mod reconciler;
mod request;
mod result;


pub use merge::*;
pub use reconciler::*;
pub use request::*;
pub use result::*;

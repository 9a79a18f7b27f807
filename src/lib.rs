//! # Policy Reconcile
//!
//! A reconciliation and query engine for remote firewall and network-policy
//! configuration objects.
//!
//! Callers describe the desired state of one object (an address, a security
//! rule, a virtual router) and a verb. The engine fetches what the device
//! currently holds, decides whether anything has to change, and issues the
//! minimal create, update, delete or move calls through an [`ObjectStore`].
//!
//! ## Modules
//!
//! - [`schema`] - Object type definitions: fields, defaults, preset values, enable fields
//! - [`value`] - Field values and canonical field maps
//! - [`object`] - Managed objects and fresh listings
//! - [`describe`] - Object to field-map rendering with field aliases
//! - [`filter`] - The boolean query language of the gathered verb
//! - [`reconcile`] - The verb state machine
//! - [`position`] - Rule placement among siblings
//! - [`store`] - The remote object store seam and an in-memory store
//! - [`commit`] - Committing the candidate configuration with bounded polling

pub mod commit;
pub mod describe;
pub mod error;
pub mod filter;
pub mod object;
pub mod position;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod value;

pub use describe::{AliasTable, Describer};
pub use error::{Error, Result};
pub use filter::{evaluate, FilterExpression};
pub use object::{CurrentListing, DesiredObject, ManagedObject};
pub use position::{Location, Placement, PositionManager};
pub use reconcile::{ChangeResult, GatherResult, Outcome, ReconcileOptions, ReconcileRequest, Reconciler, Verb};
pub use schema::{ObjectSchema, Schema};
pub use store::{MemoryStore, ObjectStore, Scope};
pub use value::{FieldMap, Value};

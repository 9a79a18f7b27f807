//! The remote object store interface consumed by the engine.

use crate::object::ManagedObject;
use crate::position::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Scope identifies the parent container of a sibling listing, such as a
/// virtual system or a rulebase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(pub String);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Scope(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation names a store primitive, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Fetch,
    Create,
    Update,
    Delete,
    Move,
    Commit,
    JobStatus,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Fetch => "fetch",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Move => "move",
            Operation::Commit => "commit",
            Operation::JobStatus => "job status",
        };
        f.write_str(s)
    }
}

/// StoreError is an opaque failure reported by a store implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        StoreError {
            message: message.into(),
        }
    }
}

/// JobId identifies an asynchronous store job such as a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {}", self.0)
    }
}

/// JobStatus is the state of an asynchronous job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "message")]
pub enum JobStatus {
    Pending,
    Finished,
    Failed(String),
}

/// ObjectStore is the remote configuration the engine reconciles against.
///
/// Every call is a blocking round-trip. Implementations must not cache
/// listings: the engine fetches fresh state for each reconciliation.
pub trait ObjectStore {
    /// Fetches every object of `object_type` under `scope`, in device order.
    fn fetch_listing(&self, scope: &Scope, object_type: &str) -> Result<Vec<ManagedObject>, StoreError>;

    /// Fetches only the uids of the listing, in device order.
    fn fetch_names(&self, scope: &Scope, object_type: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .fetch_listing(scope, object_type)?
            .into_iter()
            .map(|o| o.uid)
            .collect())
    }

    fn create(&mut self, scope: &Scope, object_type: &str, obj: &ManagedObject) -> Result<(), StoreError>;

    /// Pushes `obj`. `fields` names the fields (and child types) that changed;
    /// the whole object is authoritative for them.
    fn update(
        &mut self,
        scope: &Scope,
        object_type: &str,
        obj: &ManagedObject,
        fields: &[String],
    ) -> Result<(), StoreError>;

    fn delete(&mut self, scope: &Scope, object_type: &str, uid: &str) -> Result<(), StoreError>;

    /// Moves `uid` among its siblings. `reference` is set for before/after.
    fn move_object(
        &mut self,
        scope: &Scope,
        object_type: &str,
        uid: &str,
        location: Location,
        reference: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Starts committing the candidate configuration.
    fn commit(&mut self, description: Option<&str>) -> Result<JobId, StoreError> {
        let _ = description;
        Err(StoreError::new("commit is not supported by this store"))
    }

    fn job_status(&self, job: JobId) -> Result<JobStatus, StoreError> {
        Err(StoreError::new(format!("{} cannot be queried on this store", job)))
    }
}

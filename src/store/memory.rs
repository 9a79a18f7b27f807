//! In-memory object store.

use super::traits::{JobId, JobStatus, ObjectStore, Operation, Scope, StoreError};
use crate::object::ManagedObject;
use crate::position::Location;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;

/// StoreCall records one mutating call made against a MemoryStore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create {
        object_type: String,
        uid: String,
    },
    Update {
        object_type: String,
        uid: String,
        fields: Vec<String>,
    },
    Delete {
        object_type: String,
        uid: String,
    },
    Move {
        object_type: String,
        uid: String,
        location: Location,
        reference: Option<String>,
    },
    Commit,
}

/// MemoryStore keeps listings in memory, keyed by scope then object type.
///
/// It serializes as `{scope: {type: [objects]}}`, which is the state file
/// format of the `prc` tool. Mutating calls are logged for inspection, and a
/// single operation can be made to fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    scopes: BTreeMap<Scope, BTreeMap<String, Vec<ManagedObject>>>,

    #[serde(skip)]
    calls: Vec<StoreCall>,

    #[serde(skip)]
    fail_on: Option<Operation>,

    /// Number of status queries a commit job stays pending for.
    #[serde(skip)]
    commit_polls: u32,

    #[serde(skip)]
    commit_failure: Option<String>,

    #[serde(skip)]
    jobs: BTreeMap<u64, Cell<u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Loads a state document.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Appends an object to a listing.
    pub fn with_object(mut self, scope: &str, object_type: &str, obj: ManagedObject) -> Self {
        self.listing_mut(&Scope::new(scope), object_type).push(obj);
        self
    }

    /// Makes every call of the given operation fail.
    pub fn fail_on(mut self, operation: Operation) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Commit jobs report pending for `polls` status queries before finishing.
    pub fn with_commit_polls(mut self, polls: u32) -> Self {
        self.commit_polls = polls;
        self
    }

    /// Commit jobs finish with the given failure message.
    pub fn with_commit_failure(mut self, message: impl Into<String>) -> Self {
        self.commit_failure = Some(message.into());
        self
    }

    pub fn calls(&self) -> &[StoreCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn objects(&self, scope: &str, object_type: &str) -> &[ManagedObject] {
        self.scopes
            .get(&Scope::new(scope))
            .and_then(|types| types.get(object_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, scope: &str, object_type: &str, uid: &str) -> Option<&ManagedObject> {
        self.objects(scope, object_type).iter().find(|o| o.uid == uid)
    }

    fn listing_mut(&mut self, scope: &Scope, object_type: &str) -> &mut Vec<ManagedObject> {
        self.scopes
            .entry(scope.clone())
            .or_default()
            .entry(object_type.to_string())
            .or_default()
    }

    fn check(&self, operation: Operation) -> Result<(), StoreError> {
        if self.fail_on == Some(operation) {
            return Err(StoreError::new(format!("{} rejected by device", operation)));
        }
        Ok(())
    }
}

fn index_of(listing: &[ManagedObject], uid: &str, object_type: &str) -> Result<usize, StoreError> {
    listing
        .iter()
        .position(|o| o.uid == uid)
        .ok_or_else(|| StoreError::new(format!("{} '{}' does not exist", object_type, uid)))
}

impl ObjectStore for MemoryStore {
    fn fetch_listing(&self, scope: &Scope, object_type: &str) -> Result<Vec<ManagedObject>, StoreError> {
        self.check(Operation::Fetch)?;
        Ok(self.objects(scope.as_str(), object_type).to_vec())
    }

    fn create(&mut self, scope: &Scope, object_type: &str, obj: &ManagedObject) -> Result<(), StoreError> {
        self.check(Operation::Create)?;
        let listing = self.listing_mut(scope, object_type);
        if listing.iter().any(|o| o.uid == obj.uid) {
            return Err(StoreError::new(format!("{} '{}' already exists", object_type, obj.uid)));
        }
        listing.push(obj.clone());
        self.calls.push(StoreCall::Create {
            object_type: object_type.to_string(),
            uid: obj.uid.clone(),
        });
        Ok(())
    }

    fn update(
        &mut self,
        scope: &Scope,
        object_type: &str,
        obj: &ManagedObject,
        fields: &[String],
    ) -> Result<(), StoreError> {
        self.check(Operation::Update)?;
        let listing = self.listing_mut(scope, object_type);
        let idx = index_of(listing, &obj.uid, object_type)?;
        listing[idx] = obj.clone();
        self.calls.push(StoreCall::Update {
            object_type: object_type.to_string(),
            uid: obj.uid.clone(),
            fields: fields.to_vec(),
        });
        Ok(())
    }

    fn delete(&mut self, scope: &Scope, object_type: &str, uid: &str) -> Result<(), StoreError> {
        self.check(Operation::Delete)?;
        let listing = self.listing_mut(scope, object_type);
        let idx = index_of(listing, uid, object_type)?;
        listing.remove(idx);
        self.calls.push(StoreCall::Delete {
            object_type: object_type.to_string(),
            uid: uid.to_string(),
        });
        Ok(())
    }

    fn move_object(
        &mut self,
        scope: &Scope,
        object_type: &str,
        uid: &str,
        location: Location,
        reference: Option<&str>,
    ) -> Result<(), StoreError> {
        self.check(Operation::Move)?;
        let listing = self.listing_mut(scope, object_type);
        let idx = index_of(listing, uid, object_type)?;
        let obj = listing.remove(idx);
        let target = match (location, reference) {
            (Location::Top, _) => 0,
            (Location::Bottom, _) => listing.len(),
            (Location::Before, Some(r)) => index_of(listing, r, object_type)?,
            (Location::After, Some(r)) => index_of(listing, r, object_type)? + 1,
            (_, None) => {
                listing.insert(idx, obj);
                return Err(StoreError::new(format!("{} requires a reference", location)));
            }
        };
        listing.insert(target, obj);
        self.calls.push(StoreCall::Move {
            object_type: object_type.to_string(),
            uid: uid.to_string(),
            location,
            reference: reference.map(str::to_string),
        });
        Ok(())
    }

    fn commit(&mut self, _description: Option<&str>) -> Result<JobId, StoreError> {
        self.check(Operation::Commit)?;
        let id = self.jobs.len() as u64 + 1;
        self.jobs.insert(id, Cell::new(self.commit_polls));
        self.calls.push(StoreCall::Commit);
        Ok(JobId(id))
    }

    fn job_status(&self, job: JobId) -> Result<JobStatus, StoreError> {
        self.check(Operation::JobStatus)?;
        let remaining = self
            .jobs
            .get(&job.0)
            .ok_or_else(|| StoreError::new(format!("unknown {}", job)))?;
        if remaining.get() > 0 {
            remaining.set(remaining.get() - 1);
            return Ok(JobStatus::Pending);
        }
        Ok(match &self.commit_failure {
            Some(message) => JobStatus::Failed(message.clone()),
            None => JobStatus::Finished,
        })
    }
}

//! Relative ordering of sibling objects.

use crate::error::{Error, Result};
use crate::store::{ObjectStore, Operation, Scope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Location is where an object should sit among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Top,
    Bottom,
    Before,
    After,
}

impl Location {
    /// Before and after are relative to a reference sibling.
    pub fn needs_reference(&self) -> bool {
        matches!(self, Location::Before | Location::After)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Location::Top => "top",
            Location::Bottom => "bottom",
            Location::Before => "before",
            Location::After => "after",
        };
        f.write_str(s)
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top" => Ok(Location::Top),
            "bottom" => Ok(Location::Bottom),
            "before" => Ok(Location::Before),
            "after" => Ok(Location::After),
            other => Err(Error::position(format!("unknown location '{}'", other))),
        }
    }
}

/// Placement is a requested location plus, for before/after, the reference uid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_uid: Option<String>,
}

impl Placement {
    pub fn new(location: Location, reference_uid: Option<&str>) -> Self {
        Placement {
            location: Some(location),
            reference_uid: reference_uid.map(str::to_string),
        }
    }

    /// Checks the location/reference pairing.
    pub fn validate(&self) -> Result<()> {
        match (self.location, self.reference_uid.as_deref()) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(Error::position("a reference uid requires a location")),
            (Some(loc), None) if loc.needs_reference() => {
                Err(Error::position(format!("location '{}' requires a reference uid", loc)))
            }
            (Some(loc), Some(_)) if !loc.needs_reference() => {
                Err(Error::position(format!("location '{}' does not take a reference uid", loc)))
            }
            _ => Ok(()),
        }
    }

    pub fn is_requested(&self) -> bool {
        self.location.is_some()
    }
}

/// PositionManager moves objects among same-type siblings under one scope.
pub struct PositionManager<'a> {
    scope: &'a Scope,
    object_type: &'a str,
    check_mode: bool,
}

impl<'a> PositionManager<'a> {
    pub fn new(scope: &'a Scope, object_type: &'a str) -> Self {
        PositionManager {
            scope,
            object_type,
            check_mode: false,
        }
    }

    /// In check mode the decision is made and reported but no move is issued.
    pub fn check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Ensures `uid` satisfies `placement`. Returns whether it had to move.
    pub fn apply_position<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        uid: &str,
        placement: &Placement,
    ) -> Result<bool> {
        placement.validate()?;
        let Some(location) = placement.location else {
            return Ok(false);
        };
        let reference = placement.reference_uid.as_deref();
        if reference == Some(uid) {
            return Err(Error::position(format!("'{}' cannot be placed relative to itself", uid)));
        }

        let names = store
            .fetch_names(self.scope, self.object_type)
            .map_err(|e| Error::remote(Operation::Fetch, self.listing_name(), &[], e))?;
        let index_of = |name: &str| {
            names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| Error::not_found(self.object_type, name, self.scope.as_str()))
        };
        let object_index = index_of(uid)?;
        let reference_index = reference.map(index_of).transpose()?;

        let changed = match (location, reference_index) {
            (Location::Top, _) => object_index != 0,
            (Location::Bottom, _) => object_index + 1 != names.len(),
            (Location::Before, Some(r)) => object_index + 1 != r,
            (Location::After, Some(r)) => r + 1 != object_index,
            (_, None) => {
                return Err(Error::position(format!("location '{}' requires a reference uid", location)))
            }
        };
        debug!(
            object_type = self.object_type,
            uid,
            %location,
            object_index,
            ?reference_index,
            changed,
            "position check"
        );
        if !changed {
            return Ok(false);
        }
        if self.check_mode {
            warn!(object_type = self.object_type, uid, %location, "check mode: move skipped");
            return Ok(true);
        }

        info!(object_type = self.object_type, uid, %location, reference, "moving object");
        store
            .move_object(self.scope, self.object_type, uid, location, reference)
            .map_err(|e| {
                Error::remote(
                    Operation::Move,
                    format!("{} '{}'", self.object_type, uid),
                    &[],
                    e,
                )
            })?;
        Ok(true)
    }

    fn listing_name(&self) -> String {
        format!("{} listing in {}", self.object_type, self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ManagedObject;
    use crate::store::{MemoryStore, StoreCall};

    fn store(uids: &[&str]) -> MemoryStore {
        uids.iter().fold(MemoryStore::new(), |s, uid| {
            s.with_object("vsys1", "rule", ManagedObject::new(*uid))
        })
    }

    fn order(store: &MemoryStore) -> Vec<String> {
        store.objects("vsys1", "rule").iter().map(|o| o.uid.clone()).collect()
    }

    /// (location, reference, expected changed, expected order afterwards)
    struct PositionCase {
        uid: &'static str,
        location: Location,
        reference: Option<&'static str>,
        changed: bool,
        after: Vec<&'static str>,
    }

    #[test]
    fn test_position_cases() {
        let cases = vec![
            PositionCase { uid: "a", location: Location::Top, reference: None, changed: false, after: vec!["a", "b", "c", "d"] },
            PositionCase { uid: "c", location: Location::Top, reference: None, changed: true, after: vec!["c", "a", "b", "d"] },
            PositionCase { uid: "d", location: Location::Bottom, reference: None, changed: false, after: vec!["a", "b", "c", "d"] },
            PositionCase { uid: "a", location: Location::Bottom, reference: None, changed: true, after: vec!["b", "c", "d", "a"] },
            PositionCase { uid: "b", location: Location::Before, reference: Some("c"), changed: false, after: vec!["a", "b", "c", "d"] },
            PositionCase { uid: "d", location: Location::Before, reference: Some("b"), changed: true, after: vec!["a", "d", "b", "c"] },
            PositionCase { uid: "c", location: Location::After, reference: Some("b"), changed: false, after: vec!["a", "b", "c", "d"] },
            PositionCase { uid: "a", location: Location::After, reference: Some("c"), changed: true, after: vec!["b", "c", "a", "d"] },
        ];
        let scope = Scope::new("vsys1");
        for (i, tc) in cases.into_iter().enumerate() {
            let mut s = store(&["a", "b", "c", "d"]);
            let pm = PositionManager::new(&scope, "rule");
            let changed = pm
                .apply_position(&mut s, tc.uid, &Placement::new(tc.location, tc.reference))
                .unwrap();
            assert_eq!(changed, tc.changed, "case {}", i);
            assert_eq!(order(&s), tc.after, "case {}", i);
            assert_eq!(s.calls().is_empty(), !tc.changed, "case {}", i);
        }
    }

    #[test]
    fn test_check_mode_reports_without_moving() {
        let scope = Scope::new("vsys1");
        let mut s = store(&["a", "b", "c"]);
        let pm = PositionManager::new(&scope, "rule").check_mode(true);
        assert!(pm.apply_position(&mut s, "c", &Placement::new(Location::Top, None)).unwrap());
        assert!(s.calls().is_empty());
        assert_eq!(order(&s), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_no_location_is_noop() {
        let scope = Scope::new("vsys1");
        let mut s = store(&["a"]);
        let pm = PositionManager::new(&scope, "rule");
        assert!(!pm.apply_position(&mut s, "zzz", &Placement::default()).unwrap());
    }

    #[test]
    fn test_preconditions() {
        let scope = Scope::new("vsys1");
        let mut s = store(&["a", "b"]);
        let pm = PositionManager::new(&scope, "rule");

        let err = pm.apply_position(&mut s, "a", &Placement::new(Location::Before, None)).unwrap_err();
        assert!(matches!(err, Error::Position { .. }));

        let err = pm.apply_position(&mut s, "a", &Placement::new(Location::Top, Some("b"))).unwrap_err();
        assert!(matches!(err, Error::Position { .. }));

        let orphan = Placement {
            location: None,
            reference_uid: Some("b".to_string()),
        };
        assert!(pm.apply_position(&mut s, "a", &orphan).unwrap_err().is_validation());

        let err = pm.apply_position(&mut s, "a", &Placement::new(Location::After, Some("zzz"))).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref uid, .. } if uid == "zzz"));

        let err = pm.apply_position(&mut s, "zzz", &Placement::new(Location::Top, None)).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_move_failure_is_remote_error() {
        let scope = Scope::new("vsys1");
        let mut s = store(&["a", "b"]).fail_on(Operation::Move);
        let pm = PositionManager::new(&scope, "rule");
        let err = pm.apply_position(&mut s, "b", &Placement::new(Location::Top, None)).unwrap_err();
        assert!(matches!(err, Error::RemoteOperation { operation: Operation::Move, .. }));
        assert_eq!(s.calls(), &[] as &[StoreCall]);
    }

    #[test]
    fn test_location_parse() {
        assert_eq!("after".parse::<Location>().unwrap(), Location::After);
        assert!("middle".parse::<Location>().is_err());
    }
}

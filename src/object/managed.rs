//! Managed objects and sibling listings.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// ManagedObject is a remote or desired configuration entry.
///
/// Only fields that are set appear in `fields`. A field that is absent is
/// unset, which differs from a field explicitly set to an empty list or
/// `false`; an explicit `Value::Null` is treated the same as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedObject {
    pub uid: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Child>,
}

/// Child is a nested object tagged with its child type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    #[serde(rename = "type")]
    pub child_type: String,

    #[serde(flatten)]
    pub object: ManagedObject,
}

/// DesiredObject is the caller-constructed target state of one object.
pub type DesiredObject = ManagedObject;

impl ManagedObject {
    /// Creates an object with no fields set.
    pub fn new(uid: impl Into<String>) -> Self {
        ManagedObject {
            uid: uid.into(),
            ..Default::default()
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child_type: impl Into<String>, object: ManagedObject) -> Self {
        self.children.push(Child {
            child_type: child_type.into(),
            object,
        });
        self
    }

    /// Returns the value of a set field; unset and null fields yield None.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Iterates over set (non-null) fields.
    pub fn set_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().filter(|(_, v)| !v.is_null())
    }

    /// Distinct child types in first-seen order.
    pub fn child_types(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for child in &self.children {
            if !seen.contains(&child.child_type.as_str()) {
                seen.push(child.child_type.as_str());
            }
        }
        seen
    }

    /// Children of a single type, in order.
    pub fn children_of<'a>(&'a self, child_type: &'a str) -> impl Iterator<Item = &'a ManagedObject> + 'a {
        self.children
            .iter()
            .filter(move |c| c.child_type == child_type)
            .map(|c| &c.object)
    }

    /// Field-level equality: unset and null compare equal.
    pub fn fields_equal(&self, other: &ManagedObject) -> bool {
        self.set_fields().count() == other.set_fields().count()
            && self.set_fields().all(|(k, v)| other.field(k) == Some(v))
    }

    /// Full equality of uid, fields and children (recursively, in order).
    pub fn deep_equal(&self, other: &ManagedObject) -> bool {
        self.uid == other.uid
            && self.fields_equal(other)
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| a.child_type == b.child_type && a.object.deep_equal(&b.object))
    }
}

/// CurrentListing is a fresh, uid-unique snapshot of one object type under
/// one parent scope.
#[derive(Debug, Clone, Default)]
pub struct CurrentListing {
    objects: Vec<ManagedObject>,
}

impl CurrentListing {
    /// Builds a listing, rejecting store output that repeats a uid.
    pub fn new(object_type: &str, objects: Vec<ManagedObject>) -> Result<Self> {
        let mut seen = HashSet::new();
        for obj in &objects {
            if !seen.insert(obj.uid.as_str()) {
                return Err(Error::DuplicateUid {
                    object_type: object_type.to_string(),
                    uid: obj.uid.clone(),
                });
            }
        }
        Ok(CurrentListing { objects })
    }

    pub fn find(&self, uid: &str) -> Option<&ManagedObject> {
        self.objects.iter().find(|o| o.uid == uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManagedObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_versus_null() {
        let a = ManagedObject::new("r1").with_field("action", "allow");
        let b = ManagedObject::new("r1")
            .with_field("action", "allow")
            .with_field("description", Value::Null);
        assert!(a.fields_equal(&b));
        assert!(b.field("description").is_none());

        let c = ManagedObject::new("r1")
            .with_field("action", "allow")
            .with_field("tags", Value::List(vec![]));
        assert!(!a.fields_equal(&c));
    }

    #[test]
    fn test_duplicate_uid_rejected() {
        let err = CurrentListing::new(
            "address",
            vec![ManagedObject::new("a1"), ManagedObject::new("a2"), ManagedObject::new("a1")],
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateUid { ref uid, .. } if uid == "a1"));
    }

    #[test]
    fn test_children_helpers() {
        let obj = ManagedObject::new("vr")
            .with_child("static-route", ManagedObject::new("default"))
            .with_child("bgp-peer", ManagedObject::new("p1"))
            .with_child("static-route", ManagedObject::new("lan"));
        assert_eq!(obj.child_types(), vec!["static-route", "bgp-peer"]);
        let routes: Vec<&str> = obj.children_of("static-route").map(|c| c.uid.as_str()).collect();
        assert_eq!(routes, vec!["default", "lan"]);
    }

    #[test]
    fn test_child_yaml_shape() {
        let obj: ManagedObject = serde_yaml::from_str(
            "uid: vr1\nchildren:\n- type: static-route\n  uid: default\n  fields:\n    nexthop: 10.0.0.1\n",
        )
        .unwrap();
        assert_eq!(obj.children.len(), 1);
        assert_eq!(obj.children[0].child_type, "static-route");
        assert_eq!(obj.children[0].object.field("nexthop"), Some(&Value::from("10.0.0.1")));
    }
}

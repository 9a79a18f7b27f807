//! Field-level merge used by the merged verb.

use crate::object::ManagedObject;
use crate::schema::{FieldSpec, ObjectSchema};
use crate::value::Value;
use tracing::debug;

/// Merges a desired list value into an existing one.
///
/// If either side is a non-empty subset of the field's preset values, the
/// desired value replaces the existing one wholesale, since an exclusive
/// value like `any` cannot sit next to concrete entries. Otherwise the
/// desired elements are appended where missing.
///
/// Returns the new value, or None if nothing changes.
pub fn merge_list(spec: &FieldSpec, existing: &Value, desired: &Value) -> Option<Value> {
    if spec.is_preset_subset(existing) || spec.is_preset_subset(desired) {
        if existing == desired {
            return None;
        }
        return Some(desired.clone());
    }

    let mut items = existing.to_list();
    let mut added = false;
    for v in desired.to_list() {
        if !items.contains(&v) {
            items.push(v);
            added = true;
        }
    }
    added.then_some(Value::List(items))
}

/// Applies every set field of `desired` onto `current`.
///
/// Scalars are overwritten when they differ; lists go through `merge_list`.
/// Desired children are upserted by (child type, uid). Returns the merged
/// object and the names of the fields and child types that changed.
pub fn merge_object(
    schema: &ObjectSchema,
    current: &ManagedObject,
    desired: &ManagedObject,
) -> (ManagedObject, Vec<String>) {
    let mut merged = current.clone();
    let mut touched = Vec::new();

    for (name, value) in desired.set_fields() {
        let existing = current.field(name).cloned().unwrap_or_default();
        let next = match schema.field(name) {
            Some(spec) if spec.list => merge_list(spec, &existing, value),
            _ if existing != *value => Some(value.clone()),
            _ => None,
        };
        if let Some(v) = next {
            debug!(field = name.as_str(), from = %existing, to = %v, "merge updates field");
            merged.set_field(name.clone(), v);
            touched.push(name.clone());
        }
    }

    for child in &desired.children {
        let slot = merged
            .children
            .iter_mut()
            .find(|c| c.child_type == child.child_type && c.object.uid == child.object.uid);
        let changed = match slot {
            Some(existing) if existing.object.deep_equal(&child.object) => false,
            Some(existing) => {
                *existing = child.clone();
                true
            }
            None => {
                merged.children.push(child.clone());
                true
            }
        };
        if changed && !touched.contains(&child.child_type) {
            touched.push(child.child_type.clone());
        }
    }

    (merged, touched)
}

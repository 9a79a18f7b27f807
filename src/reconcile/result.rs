//! Reconciliation results.

use crate::value::FieldMap;
use serde::Serialize;

/// ChangeResult reports the outcome of a mutating verb with before/after
/// snapshots of the object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeResult {
    pub changed: bool,
    pub before: Option<FieldMap>,
    pub after: Option<FieldMap>,
}

impl ChangeResult {
    /// Creates an unchanged result where before and after are the same snapshot.
    pub fn unchanged(snapshot: Option<FieldMap>) -> Self {
        ChangeResult {
            changed: false,
            before: snapshot.clone(),
            after: snapshot,
        }
    }

    pub fn changed(before: Option<FieldMap>, after: Option<FieldMap>) -> Self {
        ChangeResult {
            changed: true,
            before,
            after,
        }
    }
}

/// GatherResult holds what the gathered verb matched: one object for an
/// exact uid lookup, a list for a filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GatherResult {
    One { matched: FieldMap },
    Many { matched: Vec<FieldMap> },
}

impl GatherResult {
    pub fn len(&self) -> usize {
        match self {
            GatherResult::One { .. } => 1,
            GatherResult::Many { matched } => matched.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome is what a reconciliation returns to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Change(ChangeResult),
    Gathered(GatherResult),
}

impl Outcome {
    /// True if the store was (or in check mode, would have been) changed.
    pub fn changed(&self) -> bool {
        match self {
            Outcome::Change(c) => c.changed,
            Outcome::Gathered(_) => false,
        }
    }

    pub fn as_change(&self) -> Option<&ChangeResult> {
        match self {
            Outcome::Change(c) => Some(c),
            Outcome::Gathered(_) => None,
        }
    }

    pub fn as_gathered(&self) -> Option<&GatherResult> {
        match self {
            Outcome::Gathered(g) => Some(g),
            Outcome::Change(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_result_json_shapes() {
        let change = Outcome::Change(ChangeResult::changed(None, Some(FieldMap::new())));
        assert_eq!(
            serde_json::to_string(&change).unwrap(),
            r#"{"changed":true,"before":null,"after":{}}"#
        );

        let mut m = FieldMap::new();
        m.set("name", Value::from("r1"));
        let one = Outcome::Gathered(GatherResult::One { matched: m.clone() });
        assert_eq!(serde_json::to_string(&one).unwrap(), r#"{"matched":{"name":"r1"}}"#);

        let many = Outcome::Gathered(GatherResult::Many { matched: vec![m] });
        assert_eq!(serde_json::to_string(&many).unwrap(), r#"{"matched":[{"name":"r1"}]}"#);
        assert!(!many.changed());
    }
}

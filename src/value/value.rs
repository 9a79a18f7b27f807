//! Field values and field maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value is the value of a single object field.
///
/// Lists are flat: policy objects only ever carry lists of scalar members
/// (addresses, zones, tags).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

/// FieldMap is the canonical name → value rendering of an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap {
    pub fields: BTreeMap<String, Value>,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Numeric view of the value. Strings holding a number are accepted since
    /// devices commonly report numeric settings as text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the list elements, treating null as empty and a scalar as a
    /// single element.
    pub fn to_list(&self) -> Vec<Value> {
        match self {
            Value::Null => Vec::new(),
            Value::List(l) => l.clone(),
            other => vec![other.clone()],
        }
    }

    /// Returns true if `needle` is an element of this list value, or equal to
    /// this scalar value.
    pub fn contains_element(&self, needle: &Value) -> bool {
        match self {
            Value::List(l) => l.contains(needle),
            Value::Null => false,
            other => other == needle,
        }
    }

    /// Removes every occurrence of `element`. Returns true if anything was removed.
    pub fn remove_element(&mut self, element: &Value) -> bool {
        match self {
            Value::List(l) => {
                let before = l.len();
                l.retain(|v| v != element);
                l.len() != before
            }
            Value::Null => false,
            other => {
                if other == element {
                    *other = Value::Null;
                    true
                } else {
                    false
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::List(l) => {
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                Ok(())
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(Value::from).collect())
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            // Nested documents have no field representation; keep their text.
            serde_json::Value::Object(_) => Value::String(v.to_string()),
        }
    }
}

impl FieldMap {
    pub fn new() -> Self {
        FieldMap {
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, Value)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        FieldMap {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Parse a field map from JSON.
pub fn from_json(json: &str) -> Result<FieldMap, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serialize a field map to JSON.
pub fn to_json(map: &FieldMap) -> Result<String, serde_json::Error> {
    serde_json::to_string(map)
}

/// Parse a field map from YAML.
pub fn from_yaml(yaml: &str) -> Result<FieldMap, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Bool(true), Value::Bool(true));
        assert_ne!(Value::Bool(true), Value::Bool(false));
        assert_eq!(Value::Int(42), Value::Float(42.0));
        assert_ne!(Value::String("42".into()), Value::Int(42));
    }

    #[test]
    fn test_yaml_kinds() {
        let map = from_yaml("name: web\nport: 443\nenabled: true\ntags: [a, b]\ndescription: null\n").unwrap();
        assert_eq!(map.get("name"), Some(&Value::from("web")));
        assert_eq!(map.get("port"), Some(&Value::Int(443)));
        assert_eq!(map.get("enabled"), Some(&Value::Bool(true)));
        assert_eq!(map.get("tags"), Some(&Value::from(vec!["a", "b"])));
        assert_eq!(map.get("description"), Some(&Value::Null));
    }

    #[test]
    fn test_list_helpers() {
        let mut tags = Value::from(vec!["a", "b", "a"]);
        assert!(tags.contains_element(&Value::from("b")));
        assert!(tags.remove_element(&Value::from("a")));
        assert_eq!(tags, Value::from(vec!["b"]));
        assert!(!tags.remove_element(&Value::from("zzz")));

        let mut scalar = Value::from("g1");
        assert!(scalar.remove_element(&Value::from("g1")));
        assert!(scalar.is_null());

        assert_eq!(Value::Null.to_list(), Vec::<Value>::new());
        assert_eq!(Value::from("x").to_list(), vec![Value::from("x")]);
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("2.5").as_f64(), Some(2.5));
        assert_eq!(Value::from("abc").as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut map = FieldMap::new();
        map.set("name", Value::from("r1"));
        map.set("count", Value::Int(2));
        let parsed = from_json(&to_json(&map).unwrap()).unwrap();
        assert_eq!(map, parsed);
    }
}

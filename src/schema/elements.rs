//! Object type schemas.

use crate::error::{Error, Result};
use crate::object::ManagedObject;
use crate::value::Value;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema is a registry of object types.
///
/// Types are indexed by name before the first lookup, so a Schema should be
/// considered immutable once built.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<ObjectSchema>,

    #[serde(skip)]
    type_map: OnceCell<HashMap<String, usize>>,
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        Schema::with_types(self.types.clone())
    }
}

/// ObjectSchema describes one object type: its fields, which field (if any)
/// toggles the object on and off, and how other types refer to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    /// Every type must have a unique name.
    pub name: String,

    /// External name under which the uid is described. Defaults to `name`.
    #[serde(default = "default_uid_field")]
    pub uid_field: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,

    /// The field enabled/disabled verbs flip, if the type has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_field: Option<EnableField>,

    /// Child types this object type can contain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_types: Vec<String>,

    /// Fields on other types that hold uids of this type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_by: Vec<ReferenceSpec>,
}

fn default_uid_field() -> String {
    "name".to_string()
}

/// FieldSpec pairs a field name with its value kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,

    #[serde(default, rename = "type")]
    pub scalar: Scalar,

    /// List-valued fields hold an ordered list of `scalar` elements.
    #[serde(default)]
    pub list: bool,

    /// Default value for the field, None if not present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    /// Exclusive values that cannot coexist with specific entries, such as `any`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preset_values: Vec<String>,
}

/// Scalar (AKA "primitive") is the kind of a field value or list element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Numeric,
    #[default]
    String,
    Boolean,
    Untyped,
}

/// EnableField names the boolean that switches an object on or off.
///
/// Devices usually store the inverse (`disabled: true`), hence `inverted`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnableField {
    pub name: String,
    #[serde(default)]
    pub inverted: bool,
}

/// ReferenceSpec names a field of another type that may hold this type's uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSpec {
    #[serde(rename = "type")]
    pub object_type: String,
    pub field: String,
}

impl Schema {
    /// Creates a schema with the given object types.
    pub fn with_types(types: Vec<ObjectSchema>) -> Self {
        Schema {
            types,
            type_map: OnceCell::new(),
        }
    }

    /// Parses a YAML schema document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let schema: Schema = serde_yaml::from_str(yaml)
            .map_err(|e| Error::schema(format!("failed to parse schema: {}", e)))?;
        schema.check()?;
        Ok(schema)
    }

    /// Returns the names of all object types.
    pub fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    /// Returns the named object type, if it exists.
    pub fn find_type(&self, name: &str) -> Option<&ObjectSchema> {
        let map = self.type_map.get_or_init(|| {
            self.types
                .iter()
                .enumerate()
                .map(|(i, t)| (t.name.clone(), i))
                .collect()
        });
        map.get(name).map(|&i| &self.types[i])
    }

    /// Like `find_type`, but an unknown type is an error.
    pub fn object_type(&self, name: &str) -> Result<&ObjectSchema> {
        self.find_type(name)
            .ok_or_else(|| Error::schema(format!("unknown object type '{}'", name)))
    }

    /// Checks internal consistency: unique type and field names, enable and
    /// reference fields that exist.
    pub fn check(&self) -> Result<()> {
        let mut names = std::collections::HashSet::new();
        for t in &self.types {
            if !names.insert(t.name.as_str()) {
                return Err(Error::schema(format!("duplicate type '{}'", t.name)));
            }
            let mut fields = std::collections::HashSet::new();
            for f in &t.fields {
                if f.name == t.uid_field {
                    return Err(Error::schema(format!(
                        "field '{}' of type '{}' collides with its uid field",
                        f.name, t.name
                    )));
                }
                if !fields.insert(f.name.as_str()) {
                    return Err(Error::schema(format!(
                        "duplicate field '{}' in type '{}'",
                        f.name, t.name
                    )));
                }
            }
            if let Some(enable) = &t.enable_field {
                match t.field(&enable.name) {
                    Some(f) if f.scalar == Scalar::Boolean && !f.list => {}
                    _ => {
                        return Err(Error::schema(format!(
                            "enable field '{}' of type '{}' must be a scalar boolean field",
                            enable.name, t.name
                        )))
                    }
                }
            }
        }
        for t in &self.types {
            for r in &t.referenced_by {
                let referrer = self.find_type(&r.object_type).ok_or_else(|| {
                    Error::schema(format!(
                        "type '{}' is referenced by unknown type '{}'",
                        t.name, r.object_type
                    ))
                })?;
                if referrer.field(&r.field).is_none() {
                    return Err(Error::schema(format!(
                        "type '{}' has no field '{}' referencing '{}'",
                        r.object_type, r.field, t.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl ObjectSchema {
    /// Returns the FieldSpec of the named field.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of all fields, in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Returns a copy of `obj` with every unset field that has a schema
    /// default filled in. Fields set on `obj` are never touched.
    pub fn with_defaults(&self, obj: &ManagedObject) -> ManagedObject {
        let mut out = obj.clone();
        for spec in &self.fields {
            if out.field(&spec.name).is_some() {
                continue;
            }
            if let Some(default) = &spec.default {
                let value = spec.normalize(Value::from(default));
                if !value.is_null() {
                    out.set_field(spec.name.clone(), value);
                }
            }
        }
        out
    }

    /// Validates a desired object against this type and normalizes its
    /// values: a scalar given for a list field becomes a one-element list.
    pub fn normalize_object(&self, obj: &ManagedObject) -> Result<ManagedObject> {
        if obj.uid.is_empty() {
            return Err(Error::validation(format!("{} object has an empty uid", self.name)));
        }
        let mut out = ManagedObject::new(obj.uid.clone());
        for (name, value) in &obj.fields {
            let spec = self.field(name).ok_or_else(|| {
                Error::validation(format!("{} has no field named '{}'", self.name, name))
            })?;
            let value = spec.normalize(value.clone());
            spec.check_kind(&value).map_err(|msg| {
                Error::validation(format!("{}.{}: {}", self.name, name, msg))
            })?;
            out.set_field(name.clone(), value);
        }
        for child in &obj.children {
            if !self.child_types.is_empty() && !self.child_types.contains(&child.child_type) {
                return Err(Error::validation(format!(
                    "{} cannot contain children of type '{}'",
                    self.name, child.child_type
                )));
            }
        }
        out.children = obj.children.clone();
        Ok(out)
    }
}

impl FieldSpec {
    /// Coerces a value to this field's shape where that is unambiguous.
    pub fn normalize(&self, value: Value) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::List(items) if self.list => Value::List(items),
            scalar if self.list => Value::List(vec![scalar]),
            other => other,
        }
    }

    /// Checks that a (normalized) value matches this field's kind.
    pub fn check_kind(&self, value: &Value) -> std::result::Result<(), String> {
        match value {
            Value::Null => Ok(()),
            Value::List(items) => {
                if !self.list {
                    return Err("expected a scalar, got a list".to_string());
                }
                items.iter().try_for_each(|v| self.check_scalar(v))
            }
            scalar => {
                if self.list {
                    return Err("expected a list".to_string());
                }
                self.check_scalar(scalar)
            }
        }
    }

    fn check_scalar(&self, value: &Value) -> std::result::Result<(), String> {
        let ok = match (self.scalar, value) {
            (Scalar::Untyped, _) => true,
            (Scalar::String, Value::String(_)) => true,
            (Scalar::Boolean, Value::Bool(_)) => true,
            (Scalar::Numeric, Value::Int(_) | Value::Float(_)) => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(format!("expected {:?} value, got {:?}", self.scalar, value))
        }
    }

    /// Returns true if every element of `value` is a preset value and there
    /// is at least one element.
    pub fn is_preset_subset(&self, value: &Value) -> bool {
        let items = value.to_list();
        !items.is_empty()
            && items.iter().all(|v| match v {
                Value::String(s) => self.preset_values.iter().any(|p| p == s),
                _ => false,
            })
    }
}

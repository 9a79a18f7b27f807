//! Canonical field-map rendering of managed objects.

use crate::error::{Error, Result};
use crate::object::ManagedObject;
use crate::schema::ObjectSchema;
use crate::value::{FieldMap, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// AliasTable maps external-facing field names to internal schema names.
///
/// Deserialization goes through `insert`, so overlapping entries are
/// rejected however the table is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        AliasTable::default()
    }

    /// Adds an alias. Both names must be unique in their direction.
    pub fn insert(&mut self, external: impl Into<String>, internal: impl Into<String>) -> Result<()> {
        let external = external.into();
        let internal = internal.into();
        if self.aliases.contains_key(&external) || self.aliases.values().any(|v| *v == internal) {
            return Err(Error::validation(format!(
                "alias '{}' -> '{}' overlaps an existing alias",
                external, internal
            )));
        }
        self.aliases.insert(external, internal);
        Ok(())
    }

    pub fn to_internal<'a>(&'a self, external: &'a str) -> &'a str {
        self.aliases.get(external).map(String::as_str).unwrap_or(external)
    }

    pub fn to_external<'a>(&'a self, internal: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(_, v)| v.as_str() == internal)
            .map(|(k, _)| k.as_str())
            .unwrap_or(internal)
    }
}

/// Describer renders objects of one type as field maps keyed by external
/// names, and converts such maps back into objects.
///
/// Every schema field appears in the output; unset fields are null. Children
/// and store bookkeeping never do.
#[derive(Debug, Clone)]
pub struct Describer<'a> {
    schema: &'a ObjectSchema,
    aliases: &'a AliasTable,
}

impl TryFrom<BTreeMap<String, String>> for AliasTable {
    type Error = Error;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self> {
        let mut table = AliasTable::new();
        for (external, internal) in map {
            table.insert(external, internal)?;
        }
        Ok(table)
    }
}

impl From<AliasTable> for BTreeMap<String, String> {
    fn from(table: AliasTable) -> Self {
        table.aliases
    }
}

impl<'a> Describer<'a> {
    /// Fails if two described entries of `schema` would share an external
    /// name once `aliases` are applied.
    pub fn new(schema: &'a ObjectSchema, aliases: &'a AliasTable) -> Result<Self> {
        let describer = Describer { schema, aliases };
        let mut seen = std::collections::HashSet::new();
        for name in describer.field_names() {
            if !seen.insert(name.clone()) {
                return Err(Error::validation(format!(
                    "aliases map two {} fields to the external name '{}'",
                    schema.name, name
                )));
            }
        }
        Ok(describer)
    }

    /// External name of the uid entry.
    pub fn uid_key(&self) -> &str {
        self.aliases.to_external(&self.schema.uid_field)
    }

    /// External names of every described entry, uid first.
    pub fn field_names(&self) -> Vec<String> {
        let mut names = vec![self.uid_key().to_string()];
        names.extend(
            self.schema
                .fields
                .iter()
                .map(|f| self.aliases.to_external(&f.name).to_string()),
        );
        names
    }

    pub fn describe(&self, obj: &ManagedObject) -> FieldMap {
        let mut map = FieldMap::new();
        map.set(self.uid_key(), Value::String(obj.uid.clone()));
        for spec in &self.schema.fields {
            let value = obj.field(&spec.name).cloned().unwrap_or(Value::Null);
            map.set(self.aliases.to_external(&spec.name), value);
        }
        map
    }

    /// Inverse of `describe`: null entries stay unset on the returned object.
    pub fn to_object(&self, map: &FieldMap) -> Result<ManagedObject> {
        let uid_key = self.uid_key();
        let uid = match map.get(uid_key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Int(i)) => i.to_string(),
            Some(Value::Null) | None => String::new(),
            Some(other) => {
                return Err(Error::validation(format!(
                    "'{}' must be a string, got {:?}",
                    uid_key, other
                )))
            }
        };
        let mut obj = ManagedObject::new(uid);
        for (name, value) in map.iter() {
            if name == uid_key || value.is_null() {
                continue;
            }
            let internal = self.aliases.to_internal(name);
            if self.schema.field(internal).is_none() {
                return Err(Error::validation(format!(
                    "{} has no field named '{}'",
                    self.schema.name, name
                )));
            }
            obj.set_field(internal, value.clone());
        }
        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::from_yaml(
            "types:\n- name: address\n  fields:\n  - name: ip_netmask\n  - name: tag\n    list: true\n  - name: description\n",
        )
        .unwrap()
    }

    #[test]
    fn test_describe_includes_every_field() {
        let schema = schema();
        let aliases = AliasTable::new();
        let d = Describer::new(schema.find_type("address").unwrap(), &aliases).unwrap();
        let obj = ManagedObject::new("web-01").with_field("ip_netmask", "10.1.1.1/32");

        let mut expected = FieldMap::new();
        expected.set("name", Value::from("web-01"));
        expected.set("ip_netmask", Value::from("10.1.1.1/32"));
        expected.set("tag", Value::Null);
        expected.set("description", Value::Null);
        assert_eq!(d.describe(&obj), expected);
    }

    #[test]
    fn test_aliases_apply_both_ways() {
        let schema = schema();
        let mut aliases = AliasTable::new();
        aliases.insert("value", "ip_netmask").unwrap();
        aliases.insert("uid", "name").unwrap();
        let d = Describer::new(schema.find_type("address").unwrap(), &aliases).unwrap();

        let obj = ManagedObject::new("web-01")
            .with_field("ip_netmask", "10.1.1.1/32")
            .with_field("tag", vec!["prod"]);
        let map = d.describe(&obj);
        assert_eq!(map.get("uid"), Some(&Value::from("web-01")));
        assert_eq!(map.get("value"), Some(&Value::from("10.1.1.1/32")));
        assert!(!map.has("ip_netmask"));

        assert_eq!(d.to_object(&map).unwrap(), obj);
        assert_eq!(d.field_names(), vec!["uid", "value", "tag", "description"]);
    }

    #[test]
    fn test_overlapping_alias_rejected() {
        let mut aliases = AliasTable::new();
        aliases.insert("value", "ip_netmask").unwrap();
        assert!(aliases.insert("value", "fqdn").is_err());
        assert!(aliases.insert("addr", "ip_netmask").is_err());
    }

    #[test]
    fn test_to_object_unknown_field() {
        let schema = schema();
        let aliases = AliasTable::new();
        let d = Describer::new(schema.find_type("address").unwrap(), &aliases).unwrap();
        let mut map = FieldMap::new();
        map.set("name", Value::from("a"));
        map.set("fqdn", Value::from("example.com"));
        assert!(d.to_object(&map).unwrap_err().is_validation());
    }

    #[test]
    fn test_colliding_external_names_rejected() {
        let schema = schema();
        let address = schema.find_type("address").unwrap();

        // `tag` would name both the aliased ip_netmask and the tag field.
        let mut aliases = AliasTable::new();
        aliases.insert("tag", "ip_netmask").unwrap();
        assert!(Describer::new(address, &aliases).unwrap_err().is_validation());

        // Same for a field aliased onto the uid key.
        let mut aliases = AliasTable::new();
        aliases.insert("name", "description").unwrap();
        assert!(Describer::new(address, &aliases).is_err());

        // Aliases for names the type does not have are harmless.
        let mut aliases = AliasTable::new();
        aliases.insert("members", "static_value").unwrap();
        assert!(Describer::new(address, &aliases).is_ok());
    }

    #[test]
    fn test_alias_yaml_goes_through_insert() {
        let table: AliasTable = serde_yaml::from_str("value: ip_netmask\nuid: name\n").unwrap();
        assert_eq!(table.to_internal("value"), "ip_netmask");
        assert_eq!(table.to_external("name"), "uid");
        assert_eq!(serde_yaml::from_str::<AliasTable>(&serde_yaml::to_string(&table).unwrap()).unwrap(), table);

        assert!(serde_yaml::from_str::<AliasTable>("value: ip_netmask\naddr: ip_netmask\n").is_err());
    }
}

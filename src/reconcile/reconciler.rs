//! The reconciliation state machine.

use super::merge::merge_object;
use super::request::{ReconcileOptions, ReconcileRequest, Verb};
use super::result::{ChangeResult, GatherResult, Outcome};
use crate::describe::{AliasTable, Describer};
use crate::error::{Error, Result};
use crate::filter::FilterExpression;
use crate::object::{Child, CurrentListing, ManagedObject};
use crate::position::PositionManager;
use crate::schema::{ObjectSchema, Schema};
use crate::store::{ObjectStore, Operation, Scope};
use crate::value::{FieldMap, Value};
use tracing::{debug, info, warn};

/// ReconcilerBuilder is a builder for creating a Reconciler.
pub struct ReconcilerBuilder<'a> {
    schema: &'a Schema,
    options: ReconcileOptions,
}

impl<'a> ReconcilerBuilder<'a> {
    /// Creates a builder with default options.
    pub fn new(schema: &'a Schema) -> Self {
        ReconcilerBuilder {
            schema,
            options: ReconcileOptions::default(),
        }
    }

    /// Replaces all options.
    pub fn options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets whether to decide without mutating the store.
    pub fn check_mode(mut self, value: bool) -> Self {
        self.options.check_mode = value;
        self
    }

    /// Sets the external → internal field alias table.
    pub fn aliases(mut self, aliases: AliasTable) -> Self {
        self.options.aliases = aliases;
        self
    }

    /// Builds the Reconciler.
    pub fn build(self) -> Reconciler<'a> {
        Reconciler {
            schema: self.schema,
            options: self.options,
        }
    }
}

/// Reconciler compares a desired object with the live listing and applies
/// the requested verb.
///
/// It holds no state between calls: every call fetches a fresh listing.
pub struct Reconciler<'a> {
    schema: &'a Schema,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    /// Creates a new ReconcilerBuilder.
    pub fn builder(schema: &'a Schema) -> ReconcilerBuilder<'a> {
        ReconcilerBuilder::new(schema)
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Runs one reconciliation against `store`.
    pub fn reconcile<S: ObjectStore + ?Sized>(&self, store: &mut S, request: &ReconcileRequest) -> Result<Outcome> {
        let object_schema = self.schema.object_type(&request.object_type)?;
        let desired = validate_request(object_schema, request)?;

        let pass = Pass {
            scope: &request.scope,
            object_schema,
            describer: Describer::new(object_schema, &self.options.aliases)?,
            check_mode: self.options.check_mode,
        };
        let listing = pass.fetch(store, &object_schema.name)?;
        debug!(
            scope = %request.scope,
            object_type = object_schema.name.as_str(),
            verb = %request.verb,
            objects = listing.len(),
            "fetched listing"
        );

        let mut result = match request.verb {
            Verb::Gathered => {
                return pass
                    .gather(&listing, desired.as_ref(), request.filter.as_deref())
                    .map(Outcome::Gathered)
            }
            Verb::Present | Verb::Replaced => pass.replace(store, &listing, require(desired.as_ref())?)?,
            Verb::Merged => pass.merge(store, &listing, require(desired.as_ref())?)?,
            Verb::Absent | Verb::Deleted => pass.delete(store, &listing, require(desired.as_ref())?)?,
            Verb::Enabled => pass.toggle(store, &listing, require(desired.as_ref())?, true)?,
            Verb::Disabled => pass.toggle(store, &listing, require(desired.as_ref())?, false)?,
        };

        if request.verb.accepts_placement() && request.placement.is_requested() {
            let uid = &require(desired.as_ref())?.uid;
            if pass.check_mode && result.before.is_none() {
                // Created in check mode: nothing to position yet.
                debug!(uid = uid.as_str(), "check mode: placement of new object assumed");
            } else {
                let moved = PositionManager::new(&request.scope, &object_schema.name)
                    .check_mode(pass.check_mode)
                    .apply_position(store, uid, &request.placement)?;
                result.changed |= moved;
            }
        }

        Ok(Outcome::Change(result))
    }
}

fn require(desired: Option<&ManagedObject>) -> Result<&ManagedObject> {
    desired.ok_or_else(|| Error::validation("a desired object is required"))
}

/// Checks verb/parameter combinations and normalizes the desired object.
fn validate_request(schema: &ObjectSchema, request: &ReconcileRequest) -> Result<Option<ManagedObject>> {
    request.placement.validate()?;
    let placement_given = request.placement.location.is_some() || request.placement.reference_uid.is_some();
    if placement_given && !request.verb.accepts_placement() {
        return Err(Error::validation(format!(
            "placement cannot be combined with verb '{}'",
            request.verb
        )));
    }

    match request.verb {
        Verb::Gathered => {
            return match (&request.desired, &request.filter) {
                (Some(_), Some(_)) => Err(Error::validation(
                    "gathered takes either an exact uid or a filter, not both",
                )),
                (None, None) => Err(Error::validation("gathered requires a uid or a filter")),
                (Some(d), None) if d.uid.is_empty() => {
                    Err(Error::validation("gathered requires a uid or a filter"))
                }
                (desired, _) => Ok(desired.clone()),
            };
        }
        Verb::Enabled | Verb::Disabled if schema.enable_field.is_none() => {
            return Err(Error::verb(
                request.verb.as_str(),
                schema.name.as_str(),
                "the type has no enable field",
            ));
        }
        _ => {}
    }

    if request.filter.is_some() {
        return Err(Error::validation(format!(
            "a filter cannot be combined with verb '{}'",
            request.verb
        )));
    }
    let desired = request
        .desired
        .as_ref()
        .ok_or_else(|| Error::validation(format!("verb '{}' requires a desired object", request.verb)))?;
    schema.normalize_object(desired).map(Some)
}

/// Pass is the context of a single reconciliation call.
struct Pass<'r> {
    scope: &'r Scope,
    object_schema: &'r ObjectSchema,
    describer: Describer<'r>,
    check_mode: bool,
}

impl Pass<'_> {
    fn target(&self, object_type: &str, uid: &str) -> String {
        format!("{} '{}' in {}", object_type, uid, self.scope)
    }

    fn describe(&self, obj: &ManagedObject) -> FieldMap {
        self.describer.describe(obj)
    }

    fn fetch<S: ObjectStore + ?Sized>(&self, store: &S, object_type: &str) -> Result<CurrentListing> {
        let objects = store.fetch_listing(self.scope, object_type).map_err(|e| {
            Error::remote(
                Operation::Fetch,
                format!("{} listing in {}", object_type, self.scope),
                &[],
                e,
            )
        })?;
        CurrentListing::new(object_type, objects)
    }

    fn create<S: ObjectStore + ?Sized>(&self, store: &mut S, obj: &ManagedObject) -> Result<()> {
        let object_type = self.object_schema.name.as_str();
        if self.check_mode {
            warn!(object_type, uid = obj.uid.as_str(), "check mode: create skipped");
            return Ok(());
        }
        info!(object_type, uid = obj.uid.as_str(), scope = %self.scope, "creating object");
        store
            .create(self.scope, object_type, obj)
            .map_err(|e| Error::remote(Operation::Create, self.target(object_type, &obj.uid), &[], e))
    }

    fn update<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        object_type: &str,
        obj: &ManagedObject,
        fields: &[String],
    ) -> Result<()> {
        if self.check_mode {
            warn!(object_type, uid = obj.uid.as_str(), ?fields, "check mode: update skipped");
            return Ok(());
        }
        info!(object_type, uid = obj.uid.as_str(), ?fields, "updating object");
        store
            .update(self.scope, object_type, obj, fields)
            .map_err(|e| Error::remote(Operation::Update, self.target(object_type, &obj.uid), fields, e))
    }

    fn delete_remote<S: ObjectStore + ?Sized>(&self, store: &mut S, uid: &str) -> Result<()> {
        let object_type = self.object_schema.name.as_str();
        if self.check_mode {
            warn!(object_type, uid, "check mode: delete skipped");
            return Ok(());
        }
        info!(object_type, uid, scope = %self.scope, "deleting object");
        store
            .delete(self.scope, object_type, uid)
            .map_err(|e| Error::remote(Operation::Delete, self.target(object_type, uid), &[], e))
    }

    fn create_new<S: ObjectStore + ?Sized>(&self, store: &mut S, desired: &ManagedObject) -> Result<ChangeResult> {
        let obj = self.object_schema.with_defaults(desired);
        self.create(store, &obj)?;
        Ok(ChangeResult::changed(None, Some(self.describe(&obj))))
    }

    /// present / replaced: whole-object replace, leaving children of types
    /// the desired object does not mention untouched.
    fn replace<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        listing: &CurrentListing,
        desired: &ManagedObject,
    ) -> Result<ChangeResult> {
        let Some(current) = listing.find(&desired.uid) else {
            return self.create_new(store, desired);
        };
        let desired = self.object_schema.with_defaults(desired);
        let managed = desired.child_types();

        if desired.fields_equal(current) && managed_children_equal(&desired, current, &managed) {
            debug!(uid = desired.uid.as_str(), "object already matches");
            return Ok(ChangeResult::unchanged(Some(self.describe(current))));
        }

        let mut candidate = desired.clone();
        candidate
            .children
            .extend(unmanaged_children(current, &managed).into_iter().cloned());
        let mut fields = self.object_schema.field_names();
        fields.extend(managed.iter().map(|t| t.to_string()));
        self.update(store, &self.object_schema.name, &candidate, &fields)?;
        Ok(ChangeResult::changed(
            Some(self.describe(current)),
            Some(self.describe(&candidate)),
        ))
    }

    fn merge<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        listing: &CurrentListing,
        desired: &ManagedObject,
    ) -> Result<ChangeResult> {
        let Some(current) = listing.find(&desired.uid) else {
            return self.create_new(store, desired);
        };
        let (merged, touched) = merge_object(self.object_schema, current, desired);
        if touched.is_empty() {
            return Ok(ChangeResult::unchanged(Some(self.describe(current))));
        }
        self.update(store, &self.object_schema.name, &merged, &touched)?;
        Ok(ChangeResult::changed(
            Some(self.describe(current)),
            Some(self.describe(&merged)),
        ))
    }

    fn delete<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        listing: &CurrentListing,
        desired: &ManagedObject,
    ) -> Result<ChangeResult> {
        let Some(current) = listing.find(&desired.uid) else {
            return Ok(ChangeResult::unchanged(None));
        };
        self.remove_references(store, &current.uid)?;
        self.delete_remote(store, &current.uid)?;
        Ok(ChangeResult::changed(Some(self.describe(current)), None))
    }

    /// Drops `uid` from every field declared to reference this object type.
    fn remove_references<S: ObjectStore + ?Sized>(&self, store: &mut S, uid: &str) -> Result<()> {
        let needle = Value::String(uid.to_string());
        for reference in &self.object_schema.referenced_by {
            let referrers = self.fetch(store, &reference.object_type)?;
            for obj in referrers.iter() {
                let Some(value) = obj.field(&reference.field) else {
                    continue;
                };
                if !value.contains_element(&needle) {
                    continue;
                }
                let mut value = value.clone();
                value.remove_element(&needle);
                let mut updated = obj.clone();
                updated.set_field(reference.field.clone(), value);
                debug!(
                    referrer_type = reference.object_type.as_str(),
                    referrer = obj.uid.as_str(),
                    field = reference.field.as_str(),
                    uid,
                    "removing reference"
                );
                self.update(store, &reference.object_type, &updated, &[reference.field.clone()])?;
            }
        }
        Ok(())
    }

    fn toggle<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        listing: &CurrentListing,
        desired: &ManagedObject,
        enable: bool,
    ) -> Result<ChangeResult> {
        let object_type = self.object_schema.name.as_str();
        let Some(field) = &self.object_schema.enable_field else {
            let verb = if enable { Verb::Enabled } else { Verb::Disabled };
            return Err(Error::verb(verb.as_str(), object_type, "the type has no enable field"));
        };
        let current = listing
            .find(&desired.uid)
            .ok_or_else(|| Error::not_found(object_type, desired.uid.as_str(), self.scope.as_str()))?;

        let flag = current.field(&field.name).and_then(Value::as_bool).unwrap_or(false);
        let is_enabled = flag != field.inverted;
        if is_enabled == enable {
            return Ok(ChangeResult::unchanged(Some(self.describe(current))));
        }

        let mut updated = current.clone();
        updated.set_field(field.name.clone(), Value::Bool(enable != field.inverted));
        self.update(store, object_type, &updated, &[field.name.clone()])?;
        Ok(ChangeResult::changed(
            Some(self.describe(current)),
            Some(self.describe(&updated)),
        ))
    }

    fn gather(
        &self,
        listing: &CurrentListing,
        desired: Option<&ManagedObject>,
        filter: Option<&str>,
    ) -> Result<GatherResult> {
        if let Some(filter) = filter {
            let expr = FilterExpression::parse(filter)?;
            let known = self.describer.field_names();
            expr.check_fields(known.as_slice())?;
            let mut matched = Vec::new();
            for obj in listing.iter() {
                let described = self.describe(obj);
                if expr.matches(&described)? {
                    matched.push(described);
                }
            }
            debug!(filter, matched = matched.len(), "gathered by filter");
            return Ok(GatherResult::Many { matched });
        }

        let uid = require(desired)?.uid.as_str();
        listing
            .find(uid)
            .map(|obj| GatherResult::One {
                matched: self.describe(obj),
            })
            .ok_or_else(|| Error::not_found(self.object_schema.name.as_str(), uid, self.scope.as_str()))
    }
}

/// Compares children of the managed types only, per type and in order.
fn managed_children_equal(desired: &ManagedObject, current: &ManagedObject, managed: &[&str]) -> bool {
    managed.iter().all(|&t| {
        let want: Vec<&ManagedObject> = desired.children_of(t).collect();
        let have: Vec<&ManagedObject> = current.children_of(t).collect();
        want.len() == have.len() && want.iter().zip(have.iter()).all(|(a, b)| a.deep_equal(b))
    })
}

/// Returns the children of `obj` whose type is not in `managed`.
fn unmanaged_children<'o>(obj: &'o ManagedObject, managed: &[&str]) -> Vec<&'o Child> {
    obj.children
        .iter()
        .filter(|c| !managed.contains(&c.child_type.as_str()))
        .collect()
}

//! Verbs, requests and per-call options.

use crate::commit::PollSettings;
use crate::describe::AliasTable;
use crate::error::{Error, Result};
use crate::object::DesiredObject;
use crate::position::Placement;
use crate::store::Scope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verb is the requested reconciliation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Present,
    Absent,
    Merged,
    Replaced,
    Deleted,
    Gathered,
    Enabled,
    Disabled,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Present => "present",
            Verb::Absent => "absent",
            Verb::Merged => "merged",
            Verb::Replaced => "replaced",
            Verb::Deleted => "deleted",
            Verb::Gathered => "gathered",
            Verb::Enabled => "enabled",
            Verb::Disabled => "disabled",
        }
    }

    /// Verbs after which a requested placement is applied.
    pub fn accepts_placement(&self) -> bool {
        matches!(self, Verb::Present | Verb::Replaced | Verb::Merged)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "present" => Verb::Present,
            "absent" => Verb::Absent,
            "merged" => Verb::Merged,
            "replaced" => Verb::Replaced,
            "deleted" => Verb::Deleted,
            "gathered" => Verb::Gathered,
            "enabled" => Verb::Enabled,
            "disabled" => Verb::Disabled,
            other => return Err(Error::validation(format!("unsupported verb '{}'", other))),
        })
    }
}

/// ReconcileRequest is one reconciliation call.
///
/// `desired` is required for every verb except gathered, where either the
/// desired uid (exact lookup) or `filter` selects what to return.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub scope: Scope,
    pub object_type: String,
    pub verb: Verb,
    pub desired: Option<DesiredObject>,
    pub filter: Option<String>,
    pub placement: Placement,
}

impl ReconcileRequest {
    pub fn new(scope: impl Into<String>, object_type: impl Into<String>, verb: Verb) -> Self {
        ReconcileRequest {
            scope: Scope::new(scope),
            object_type: object_type.into(),
            verb,
            desired: None,
            filter: None,
            placement: Placement::default(),
        }
    }

    pub fn desired(mut self, desired: DesiredObject) -> Self {
        self.desired = Some(desired);
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

/// ReconcileOptions is the explicit behaviour configuration of a Reconciler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOptions {
    /// Decide and report without mutating the store.
    #[serde(default)]
    pub check_mode: bool,

    /// External → internal field names used for describing and filtering.
    #[serde(default)]
    pub aliases: AliasTable,

    /// Bounds for waiting on commit jobs.
    #[serde(default)]
    pub poll: PollSettings,
}

impl ReconcileOptions {
    /// Loads options from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::validation(format!("invalid options: {}", e)))
    }
}

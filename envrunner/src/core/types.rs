//! Shared deterministic types for environment state and phase execution.
//!
//! These types carry no I/O. Persistence lives in [`crate::io`]; concurrency
//! lives in [`crate::orchestrator`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved key inside a component sub-object listing its secret fields.
pub const SECRET_FIELDS_KEY: &str = "secretFields";

/// Fields a component operation wants merged into its own state sub-object.
pub type StateDelta = Map<String, Value>;

/// Fixed lifecycle stages a component may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Scaffold,
    Provision,
    Configure,
    Deploy,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Scaffold,
        Phase::Provision,
        Phase::Configure,
        Phase::Deploy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Scaffold => "scaffold",
            Phase::Provision => "provision",
            Phase::Configure => "configure",
            Phase::Deploy => "deploy",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| format!("unknown phase '{s}'"))
    }
}

/// Per-component state of one environment.
///
/// Each key is a component name; each value is the JSON object owned by that
/// component. Serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvState(BTreeMap<String, Map<String, Value>>);

impl EnvState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(&self, name: &str) -> Option<&Map<String, Value>> {
        self.0.get(name)
    }

    pub fn component_mut(&mut self, name: &str) -> &mut Map<String, Value> {
        self.0.entry(name.to_string()).or_default()
    }

    pub fn insert_component(&mut self, name: impl Into<String>, fields: Map<String, Value>) {
        self.0.insert(name.into(), fields);
    }

    pub fn components(&self) -> impl Iterator<Item = (&String, &Map<String, Value>)> {
        self.0.iter()
    }

    pub fn components_mut(&mut self) -> impl Iterator<Item = (&String, &mut Map<String, Value>)> {
        self.0.iter_mut()
    }

    pub fn into_components(self) -> impl Iterator<Item = (String, Map<String, Value>)> {
        self.0.into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Secret field names the component declared via [`SECRET_FIELDS_KEY`].
    pub fn secret_fields(&self, name: &str) -> Vec<String> {
        self.component(name)
            .and_then(|fields| fields.get(SECRET_FIELDS_KEY))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn into_value(self) -> Value {
        Value::Object(
            self.0
                .into_iter()
                .map(|(name, fields)| (name, Value::Object(fields)))
                .collect(),
        )
    }
}

impl FromIterator<(String, Map<String, Value>)> for EnvState {
    fn from_iter<I: IntoIterator<Item = (String, Map<String, Value>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One named environment: user config plus logical (decrypted) state.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub name: String,
    pub config: Value,
    pub state: EnvState,
}

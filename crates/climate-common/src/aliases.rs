//! Declarative variable alias table.
//!
//! File producers name the same physical quantity differently (bias-adjusted
//! `prAdjust` vs raw `pr`, ...). Readers receive the ordered candidate list
//! for a logical variable and pick the first one present.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};

/// Logical variable name mapped to acceptable physical names, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableAliases {
    table: BTreeMap<String, Vec<String>>,
}

const ADJUSTED_VARIABLES: &[&str] = &["pr", "tas", "tasmax", "tasmin", "rsds", "rlds", "huss", "sfcWind"];

impl Default for VariableAliases {
    fn default() -> Self {
        let table = ADJUSTED_VARIABLES
            .iter()
            .map(|v| {
                (
                    v.to_string(),
                    vec![format!("{}Adjust", v), format!("{}Adjusted", v), v.to_string()],
                )
            })
            .collect();
        Self { table }
    }
}

impl VariableAliases {
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Parse a table from YAML (`pr: [prAdjust, pr]`).
    pub fn from_yaml(yaml: &str) -> ClimateResult<Self> {
        let aliases: VariableAliases = serde_yaml::from_str(yaml)?;
        if let Some((logical, _)) = aliases.table.iter().find(|(_, names)| names.is_empty()) {
            return Err(ClimateError::Config(format!(
                "alias list for '{}' is empty",
                logical
            )));
        }
        Ok(aliases)
    }

    pub fn load(path: &std::path::Path) -> ClimateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClimateError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn insert(&mut self, logical: &str, names: Vec<String>) {
        self.table.insert(logical.to_string(), names);
    }

    /// Candidate physical names for a logical variable. Unknown logical
    /// names map to themselves.
    pub fn candidates(&self, logical: &str) -> Vec<String> {
        self.table
            .get(logical)
            .cloned()
            .unwrap_or_else(|| vec![logical.to_string()])
    }

    pub fn logical_names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

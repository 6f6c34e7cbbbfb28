//! Test-set manifest model.
//!
//! The manifest is produced by the external build system; the core only
//! consumes it. Format is JSON with a `test_set` header and a
//! `test_set_tests` map of per-test definitions. The header's `tests` list
//! fixes the stable ordering used for traversal tie-breaks.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ManifestError;
use crate::types::collections::FxHashMap;
use crate::types::ids::TestId;

/// Test-set header: name, assertion, declared test order, child subsets.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TestSet {
    pub name: String,
    #[serde(default)]
    pub assertion: String,
    /// Declared test order. Traversals break ties in this order.
    #[serde(default)]
    pub tests: Vec<TestId>,
    /// Child subset names, opaque to the core; mirrored into the report.
    #[serde(default)]
    pub subsets: Vec<String>,
}

/// Per-test definition from the build system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestTest {
    pub assertion: String,
    /// Executable path resolved by the external build system.
    pub executable: String,
    #[serde(default)]
    pub depends_on: Vec<TestId>,
    /// Drives lifecycle sync: a disabled test is excluded from execution.
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<String>,
    /// Opaque key/value pairs propagated to reports untouched.
    #[serde(default, skip_serializing_if = "FxHashMap::is_empty")]
    pub parameters: FxHashMap<String, String>,
}

/// The full manifest document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    #[serde(default)]
    pub test_set: TestSet,
    #[serde(default)]
    pub test_set_tests: FxHashMap<TestId, ManifestTest>,
}

impl Manifest {
    /// Load and validate a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a manifest from a JSON string.
    pub fn from_json_str(raw: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(raw).map_err(|e| ManifestError::Parse {
            message: e.to_string(),
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate internal consistency: every declared test has a definition
    /// and a non-empty assertion. Dependency ids are validated later, at
    /// graph construction, where the full node set is known.
    pub fn validate(&self) -> Result<(), ManifestError> {
        for id in &self.test_set.tests {
            if !self.test_set_tests.contains_key(id) {
                return Err(ManifestError::MissingDefinition {
                    id: id.to_string(),
                });
            }
        }
        for (id, test) in &self.test_set_tests {
            if test.assertion.trim().is_empty() {
                return Err(ManifestError::EmptyAssertion { id: id.to_string() });
            }
        }
        Ok(())
    }

    /// All test ids in stable order: the declared `test_set.tests` order
    /// first, then any defined-but-undeclared tests sorted by id.
    pub fn ordered_ids(&self) -> Vec<TestId> {
        let mut ordered: Vec<TestId> = self.test_set.tests.clone();
        let declared: crate::types::collections::FxHashSet<&TestId> =
            self.test_set.tests.iter().collect();
        let mut rest: Vec<TestId> = self
            .test_set_tests
            .keys()
            .filter(|id| !declared.contains(id))
            .cloned()
            .collect();
        rest.sort();
        ordered.extend(rest);
        ordered
    }

    /// Ids of tests marked `disabled` in the manifest.
    pub fn disabled_ids(&self) -> Vec<TestId> {
        self.test_set_tests
            .iter()
            .filter(|(_, t)| t.disabled)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

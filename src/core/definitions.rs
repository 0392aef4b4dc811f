//! Build-system definitions handed to the external build tool.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A definition value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefinitionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl DefinitionValue {
    /// Render the value the way CMake expects it on the command line.
    pub fn render(&self) -> String {
        match self {
            DefinitionValue::Bool(true) => "ON".to_string(),
            DefinitionValue::Bool(false) => "OFF".to_string(),
            DefinitionValue::Int(i) => i.to_string(),
            DefinitionValue::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for DefinitionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<bool> for DefinitionValue {
    fn from(b: bool) -> Self {
        DefinitionValue::Bool(b)
    }
}

impl From<i64> for DefinitionValue {
    fn from(i: i64) -> Self {
        DefinitionValue::Int(i)
    }
}

impl From<&str> for DefinitionValue {
    fn from(s: &str) -> Self {
        DefinitionValue::Str(s.to_string())
    }
}

impl From<String> for DefinitionValue {
    fn from(s: String) -> Self {
        DefinitionValue::Str(s)
    }
}

/// Key/value definitions for one build, sorted by key.
///
/// Only the definition compiler constructs these; there is no way to
/// mutate a finished set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BuildDefinitions {
    entries: BTreeMap<String, DefinitionValue>,
}

impl BuildDefinitions {
    pub(crate) fn from_entries(entries: BTreeMap<String, DefinitionValue>) -> Self {
        BuildDefinitions { entries }
    }

    pub fn get(&self, key: &str) -> Option<&DefinitionValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DefinitionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render as `-DKEY=VALUE` arguments.
    pub fn to_cmake_args(&self) -> Vec<String> {
        self.iter()
            .map(|(k, v)| format!("-D{}={}", k, v.render()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_values() {
        assert_eq!(DefinitionValue::from(true).render(), "ON");
        assert_eq!(DefinitionValue::from(false).render(), "OFF");
        assert_eq!(DefinitionValue::from(5i64).render(), "5");
        assert_eq!(DefinitionValue::from("-pthread").render(), "-pthread");
    }

    #[test]
    fn test_cmake_args_sorted_by_key() {
        let mut entries = BTreeMap::new();
        entries.insert("CAF_NO_TOOLS".to_string(), DefinitionValue::Bool(true));
        entries.insert("CAF_LOG_LEVEL".to_string(), DefinitionValue::Int(3));

        let defs = BuildDefinitions::from_entries(entries);
        assert_eq!(
            defs.to_cmake_args(),
            vec!["-DCAF_LOG_LEVEL=3", "-DCAF_NO_TOOLS=ON"]
        );
    }
}

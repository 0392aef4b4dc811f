//! External dependency requirements.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A pinned requirement on an external package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyRequirement {
    /// Package name (e.g., "openssl")
    pub name: String,
    /// Exact version the rule generation pins
    pub version: String,
    /// Optional `user/channel` qualifier of the package reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_channel: Option<String>,
}

impl DependencyRequirement {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        DependencyRequirement {
            name: name.into(),
            version: version.into(),
            user_channel: None,
        }
    }

    pub fn with_user_channel(mut self, user_channel: impl Into<String>) -> Self {
        self.user_channel = Some(user_channel.into());
        self
    }
}

impl fmt::Display for DependencyRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user_channel {
            Some(uc) => write!(f, "{}/{}@{}", self.name, self.version, uc),
            None => write!(f, "{}/{}", self.name, self.version),
        }
    }
}

/// The dependencies that must be fetched before building.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencySet {
    requirements: BTreeSet<DependencyRequirement>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, requirement: DependencyRequirement) {
        self.requirements.insert(requirement);
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyRequirement> {
        self.requirements.iter()
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a DependencyRequirement;
    type IntoIter = std::collections::btree_set::Iter<'a, DependencyRequirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.requirements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_display() {
        let plain = DependencyRequirement::new("openssl", "1.1.1g");
        assert_eq!(plain.to_string(), "openssl/1.1.1g");

        let channel = DependencyRequirement::new("OpenSSL", "1.0.2o").with_user_channel("conan/stable");
        assert_eq!(channel.to_string(), "OpenSSL/1.0.2o@conan/stable");
    }

    #[test]
    fn test_set_deduplicates() {
        let mut set = DependencySet::new();
        set.insert(DependencyRequirement::new("openssl", "1.1.1g"));
        set.insert(DependencyRequirement::new("openssl", "1.1.1g"));
        assert_eq!(set.len(), 1);
    }
}

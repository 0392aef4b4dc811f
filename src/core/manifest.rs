//! Package manifest: what a resolved configuration produces and links.

use serde::Serialize;

/// Artifacts produced by a resolved configuration plus the system
/// libraries consumers must link.
///
/// Artifact order is link order. System libraries always come after the
/// artifacts and appear at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    artifacts: Vec<String>,
    system_libs: Vec<String>,
}

impl Manifest {
    pub(crate) fn new(artifacts: Vec<String>, system_libs: Vec<String>) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(system_libs.len());
        for lib in system_libs {
            if !deduped.contains(&lib) {
                deduped.push(lib);
            }
        }

        Manifest {
            artifacts,
            system_libs: deduped,
        }
    }

    /// Library artifacts in link order.
    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }

    /// System libraries, in table order.
    pub fn system_libs(&self) -> &[String] {
        &self.system_libs
    }

    /// The full link line: artifacts followed by system libraries.
    pub fn libs(&self) -> Vec<&str> {
        self.artifacts
            .iter()
            .chain(self.system_libs.iter())
            .map(|s| s.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_libs_follow_artifacts() {
        let manifest = Manifest::new(
            vec!["caf_core".to_string(), "caf_io".to_string()],
            vec!["ws2_32".to_string(), "iphlpapi".to_string(), "ws2_32".to_string()],
        );

        assert_eq!(manifest.system_libs(), ["ws2_32", "iphlpapi"]);
        assert_eq!(
            manifest.libs(),
            vec!["caf_core", "caf_io", "ws2_32", "iphlpapi"]
        );
    }
}

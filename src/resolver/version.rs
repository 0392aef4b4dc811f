//! Compiler version handling.
//!
//! Compiler settings use short versions ("4.9", "14", "10.0") that plain
//! semver rejects, so parsing fills in the missing components before
//! comparison.

use semver::{Version, VersionReq};

/// Parse a version string, allowing for incomplete versions.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    let s = s.trim();

    // Try exact parse first
    if let Ok(v) = s.parse() {
        return Some(v);
    }

    // Try adding missing components
    let parts: Vec<&str> = s.split('.').collect();
    match parts.len() {
        1 => {
            let major: u64 = parts[0].parse().ok()?;
            Some(Version::new(major, 0, 0))
        }
        2 => {
            let major: u64 = parts[0].parse().ok()?;
            let minor: u64 = parts[1].parse().ok()?;
            Some(Version::new(major, minor, 0))
        }
        _ => None,
    }
}

/// Check a version against a requirement.
///
/// Pre-release tags are ignored: compiler versions like `10.0.0-beta`
/// should fall into the same windows as `10.0.0`.
pub fn version_matches(req: &VersionReq, version: &Version) -> bool {
    if version.pre.is_empty() {
        return req.matches(version);
    }

    let release = Version::new(version.major, version.minor, version.patch);
    req.matches(&release)
}

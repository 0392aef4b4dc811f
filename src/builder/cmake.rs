//! CMake invocation for a resolved configuration.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::definitions::BuildDefinitions;
use crate::core::platform::{BuildType, PlatformDescriptor};
use crate::rules::RuleTable;

/// Everything the build step needs to drive CMake.
///
/// Rendering is pure; running the commands is left to a build invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CMakeInvocation {
    pub definitions: BuildDefinitions,
    pub build_type: BuildType,
    pub shared: bool,
    /// Source patch to apply before configuring, if any.
    pub patch: Option<String>,
}

impl CMakeInvocation {
    /// Arguments that only depend on the configuration.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-DCMAKE_BUILD_TYPE={}", self.build_type.cmake_name()),
            format!(
                "-DBUILD_SHARED_LIBS={}",
                if self.shared { "ON" } else { "OFF" }
            ),
        ];
        args.extend(self.definitions.to_cmake_args());
        args
    }

    /// Full configure command line, without the program name.
    pub fn configure_args(&self, source_dir: &Path, build_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            source_dir.display().to_string(),
            "-B".to_string(),
            build_dir.display().to_string(),
        ];
        args.extend(self.args());
        args
    }

    /// Build command line. `--config` covers multi-config generators like
    /// Visual Studio.
    pub fn build_args(&self, build_dir: &Path) -> Vec<String> {
        vec![
            "--build".to_string(),
            build_dir.display().to_string(),
            "--parallel".to_string(),
            "--config".to_string(),
            self.build_type.cmake_name().to_string(),
        ]
    }

    /// Install command line.
    pub fn install_args(&self, build_dir: &Path, prefix: &Path) -> Vec<String> {
        vec![
            "--install".to_string(),
            build_dir.display().to_string(),
            "--config".to_string(),
            self.build_type.cmake_name().to_string(),
            "--prefix".to_string(),
            prefix.display().to_string(),
        ]
    }
}

/// Pick the source patch for the platform. The first matching rule wins.
pub fn select_patch(platform: &PlatformDescriptor, rules: &RuleTable) -> Option<String> {
    rules
        .patches
        .iter()
        .find(|rule| rule.platform.matches(platform))
        .map(|rule| rule.patch.clone())
}

/// Default out-of-source build directory for a package.
pub fn build_dir_for(root: &Path, package_id: &str) -> PathBuf {
    root.join("cmake-build").join(package_id)
}

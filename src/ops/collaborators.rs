//! Collaborators that act on a resolved configuration.
//!
//! Fetching dependencies, running the build and publishing the package all
//! happen outside this crate. The traits here are the seams; [`execute`]
//! drives them in order and only accepts a [`Resolution`], so a rejected
//! configuration never reaches any of them.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::builder::cmake::{build_dir_for, CMakeInvocation};
use crate::core::dependency::{DependencyRequirement, DependencySet};
use crate::core::manifest::Manifest;
use crate::ops::resolve::Resolution;

/// Fetches external dependencies.
pub trait DependencyFetcher {
    fn fetch(&mut self, requirement: &DependencyRequirement) -> Result<()>;
}

/// Runs the external build tool.
pub trait BuildInvoker {
    /// Configure and build.
    fn build(&mut self, package_id: &str, invocation: &CMakeInvocation) -> Result<()>;

    /// Install the built artifacts into the package.
    fn install(&mut self, package_id: &str, invocation: &CMakeInvocation) -> Result<()>;
}

/// Publishes the package metadata.
pub trait PackagePublisher {
    fn publish(&mut self, package_id: &str, manifest: &Manifest, deps: &DependencySet)
        -> Result<()>;
}

/// Drive fetch, build, install and publish for a resolution.
pub fn execute(
    resolution: &Resolution<'_>,
    fetcher: &mut dyn DependencyFetcher,
    invoker: &mut dyn BuildInvoker,
    publisher: &mut dyn PackagePublisher,
) -> Result<()> {
    let package_id = resolution.package_id();

    for requirement in resolution.deps() {
        fetcher.fetch(requirement)?;
    }

    invoker.build(package_id, &resolution.build_invocation()?)?;
    invoker.install(package_id, &resolution.build_invocation()?)?;

    publisher.publish(package_id, resolution.manifest(), resolution.deps())?;

    tracing::info!("Finished {}", package_id);
    Ok(())
}

/// One step a dry run would have performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum Step {
    Fetch { requirement: String },
    Patch { patch: String },
    Configure { args: Vec<String> },
    Build { args: Vec<String> },
    Install { args: Vec<String> },
    Publish { package_id: String, libs: Vec<String> },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Fetch { requirement } => write!(f, "fetch {}", requirement),
            Step::Patch { patch } => write!(f, "patch {}", patch),
            Step::Configure { args } => write!(f, "cmake {}", args.join(" ")),
            Step::Build { args } => write!(f, "cmake {}", args.join(" ")),
            Step::Install { args } => write!(f, "cmake {}", args.join(" ")),
            Step::Publish { package_id, libs } => {
                write!(f, "publish {} (libs: {})", package_id, libs.join(", "))
            }
        }
    }
}

/// Records the steps instead of performing them.
#[derive(Debug)]
pub struct DryRun {
    source_dir: PathBuf,
    work_dir: PathBuf,
    steps: Vec<Step>,
}

impl DryRun {
    pub fn new(source_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        DryRun {
            source_dir: source_dir.into(),
            work_dir: work_dir.into(),
            steps: Vec::new(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    fn record(&mut self, step: Step) {
        tracing::info!("[dry-run] {}", step);
        self.steps.push(step);
    }

    fn build_dir(&self, package_id: &str) -> PathBuf {
        build_dir_for(&self.work_dir, package_id)
    }

    fn package_dir(&self, package_id: &str) -> PathBuf {
        self.work_dir.join("package").join(package_id)
    }
}

impl DependencyFetcher for DryRun {
    fn fetch(&mut self, requirement: &DependencyRequirement) -> Result<()> {
        self.record(Step::Fetch {
            requirement: requirement.to_string(),
        });
        Ok(())
    }
}

impl BuildInvoker for DryRun {
    fn build(&mut self, package_id: &str, invocation: &CMakeInvocation) -> Result<()> {
        if let Some(patch) = &invocation.patch {
            self.record(Step::Patch {
                patch: patch.clone(),
            });
        }

        let build_dir = self.build_dir(package_id);
        let configure = invocation.configure_args(&self.source_dir, &build_dir);
        self.record(Step::Configure { args: configure });
        self.record(Step::Build {
            args: invocation.build_args(&build_dir),
        });
        Ok(())
    }

    fn install(&mut self, package_id: &str, invocation: &CMakeInvocation) -> Result<()> {
        let args = invocation.install_args(&self.build_dir(package_id), &self.package_dir(package_id));
        self.record(Step::Install { args });
        Ok(())
    }
}

impl PackagePublisher for DryRun {
    fn publish(
        &mut self,
        package_id: &str,
        manifest: &Manifest,
        _deps: &DependencySet,
    ) -> Result<()> {
        self.record(Step::Publish {
            package_id: package_id.to_string(),
            libs: manifest.libs().into_iter().map(String::from).collect(),
        });
        Ok(())
    }
}

/// Run the collaborators of a resolution as a dry run.
pub fn plan(resolution: &Resolution<'_>, source_dir: &Path, work_dir: &Path) -> Result<Vec<Step>> {
    let mut fetcher = DryRun::new(source_dir, work_dir);
    let mut invoker = DryRun::new(source_dir, work_dir);
    let mut publisher = DryRun::new(source_dir, work_dir);

    execute(resolution, &mut fetcher, &mut invoker, &mut publisher)?;

    let mut steps = fetcher.into_steps();
    steps.extend(invoker.into_steps());
    steps.extend(publisher.into_steps());
    Ok(steps)
}

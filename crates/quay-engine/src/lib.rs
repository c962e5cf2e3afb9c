//! The quay operations: install, project, build, publish, package-install,
//! lint and doctor.
//!
//! Each operation takes a [`Context`] (project root plus tool locator) and
//! its own options struct, and wraps exactly one external tool invocation.

pub mod build;
pub mod dist;
pub mod doctor;
pub mod error;
pub mod install;
pub mod lint;
pub mod package_install;
pub mod project;
pub mod publish;
pub mod run;

#[cfg(all(test, unix))]
mod test_support;

pub use build::{build, BuildOptions, BuildResult};
pub use doctor::{doctor, CheckStatus, DoctorReport};
pub use error::{EngineError, FailureKind};
pub use install::{install, InstallOptions};
pub use lint::{lint, LintOptions, LintReport};
pub use package_install::{package_install, PackageInstallOptions, PackageInstallResult};
pub use project::{Context, Project};
pub use publish::{publish, PublishOptions, PublishResult, Rule, Violation};
pub use run::{run_project, RunOptions};

//! Install the built wheel as a standalone application with pipx.

use std::path::PathBuf;

use quay_tools::{Tool, ToolCommand};

use crate::error::EngineError;
use crate::project::Context;

/// Options for `quay package-install`.
#[derive(Debug, Clone, Default)]
pub struct PackageInstallOptions {
    /// Arguments forwarded to `pipx install`.
    pub extra_args: Vec<String>,
}

/// Result of a successful install.
#[derive(Debug)]
pub struct PackageInstallResult {
    /// The wheel that was installed.
    pub wheel: PathBuf,
    /// Console scripts the installation provides.
    pub scripts: Vec<String>,
}

/// Find the wheel for the current version and force-install it with pipx.
///
/// An existing installation of the same application is always replaced.
///
/// # Errors
/// Returns an error if the project declares no console scripts, no wheel or
/// more than one wheel matches, or pipx is missing or fails.
pub fn package_install(
    ctx: &Context,
    options: &PackageInstallOptions,
) -> Result<PackageInstallResult, EngineError> {
    let project = ctx.load()?;
    let meta = project.metadata()?;
    if meta.scripts.is_empty() {
        return Err(EngineError::NoConsoleScripts { name: meta.name });
    }

    let pattern = format!("{}-{}-*.whl", meta.escaped_name(), meta.version_string());
    let shown_pattern = format!("{}/{pattern}", project.manifest.settings().dist_dir);
    let wheels = quay_util::fs::list_files(&project.dist_dir(), &pattern)?;
    let wheel = match wheels.as_slice() {
        [] => {
            return Err(EngineError::NoWheel {
                pattern: shown_pattern,
            })
        }
        [wheel] => wheel.clone(),
        many => {
            return Err(EngineError::AmbiguousWheel {
                pattern: shown_pattern,
                files: many
                    .iter()
                    .map(|w| project.relative(w).display().to_string())
                    .collect(),
            })
        }
    };

    let pipx = ctx.tools.locate(Tool::Pipx)?;
    eprintln!("  Installing {}", project.relative(&wheel).display());
    let cmd = ToolCommand::pipx_install(&pipx, &wheel)
        .extra_args(&options.extra_args)
        .current_dir(&project.root);
    let code = quay_util::process::run_passthrough(&mut cmd.command())?;
    if code != 0 {
        return Err(EngineError::ToolFailed {
            tool: Tool::Pipx,
            command: cmd.display(),
            code,
        });
    }

    Ok(PackageInstallResult {
        wheel,
        scripts: meta.scripts,
    })
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::build::{build, BuildOptions};
    use crate::error::FailureKind;
    use crate::test_support::{Sandbox, POETRY_BUILDS_PROJ, PROJ_MANIFEST};

    #[test]
    fn build_then_install_declared_script() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.stub(Tool::Poetry, POETRY_BUILDS_PROJ);
        sb.stub(Tool::Pipx, "exit 0");
        build(&sb.context(), &BuildOptions::default()).unwrap();

        let result = package_install(&sb.context(), &PackageInstallOptions::default()).unwrap();
        assert_eq!(result.scripts, vec!["proj"]);
        assert!(result.wheel.ends_with("dist/proj-2.3.1-py3-none-any.whl"));
        let calls = sb.calls(Tool::Pipx);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("install --force "));
        assert!(calls[0].ends_with("proj-2.3.1-py3-none-any.whl"));
    }

    #[test]
    fn reinstall_forces_every_time() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.write("dist/proj-2.3.1-py3-none-any.whl", "wheel");
        sb.stub(Tool::Pipx, "exit 0");

        package_install(&sb.context(), &PackageInstallOptions::default()).unwrap();
        package_install(&sb.context(), &PackageInstallOptions::default()).unwrap();
        let calls = sb.calls(Tool::Pipx);
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.contains("--force")));
    }

    #[test]
    fn no_wheel_names_pattern() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.write("dist/proj-2.3.1.tar.gz", "sdist only");
        sb.stub(Tool::Pipx, "exit 0");

        let err = package_install(&sb.context(), &PackageInstallOptions::default()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Precondition);
        assert!(err.to_string().contains("dist/proj-2.3.1-*.whl"));
        assert!(sb.calls(Tool::Pipx).is_empty());
    }

    #[test]
    fn several_wheels_are_ambiguous() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.write("dist/proj-2.3.1-py3-none-any.whl", "a");
        sb.write("dist/proj-2.3.1-cp312-cp312-linux_x86_64.whl", "b");
        sb.stub(Tool::Pipx, "exit 0");

        let err = package_install(&sb.context(), &PackageInstallOptions::default()).unwrap_err();
        let EngineError::AmbiguousWheel { files, .. } = &err else {
            unreachable!("expected ambiguity, got {err:?}");
        };
        assert_eq!(files.len(), 2);
        assert!(sb.calls(Tool::Pipx).is_empty());
    }

    #[test]
    fn project_without_scripts_is_rejected() {
        let sb = Sandbox::with_manifest("[project]\nname = \"proj\"\nversion = \"2.3.1\"\n");
        sb.write("dist/proj-2.3.1-py3-none-any.whl", "wheel");
        sb.stub(Tool::Pipx, "exit 0");

        let err = package_install(&sb.context(), &PackageInstallOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::NoConsoleScripts { .. }));
    }

    #[test]
    fn pipx_failure_propagates_status() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.write("dist/proj-2.3.1-py3-none-any.whl", "wheel");
        sb.stub(Tool::Pipx, "exit 5");

        let err = package_install(&sb.context(), &PackageInstallOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn escaped_name_selects_wheel() {
        let sb = Sandbox::with_manifest(
            "[project]\nname = \"Primitive-DB\"\nversion = \"0.1.0\"\n\n[project.scripts]\nproject = \"primitive_db.main:main\"\n",
        );
        sb.write("dist/primitive_db-0.1.0-py3-none-any.whl", "wheel");
        sb.stub(Tool::Pipx, "exit 0");

        let result = package_install(&sb.context(), &PackageInstallOptions::default()).unwrap();
        assert!(result.wheel.ends_with("primitive_db-0.1.0-py3-none-any.whl"));
    }
}

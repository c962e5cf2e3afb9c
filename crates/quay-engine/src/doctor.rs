//! Environment and project health checks for `quay doctor`.

use quay_config::{BuildRecord, Manifest};
use quay_tools::Tool;

use crate::project::Context;

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Ok(String),
    /// Not fatal; some operations will be unavailable.
    Warn(String),
    Fail(String),
}

/// One line of the doctor report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub label: String,
    pub status: CheckStatus,
}

/// All checks, in display order.
#[derive(Debug, Default)]
pub struct DoctorReport {
    pub checks: Vec<Check>,
}

impl DoctorReport {
    /// Number of failed checks.
    pub fn issues(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| matches!(c.status, CheckStatus::Fail(_)))
            .count()
    }

    fn push(&mut self, label: impl Into<String>, status: CheckStatus) {
        self.checks.push(Check {
            label: label.into(),
            status,
        });
    }
}

/// Check every tool and the project manifest. Never fails; problems are
/// reported as [`CheckStatus::Fail`] entries.
pub fn doctor(ctx: &Context) -> DoctorReport {
    let mut report = DoctorReport::default();

    for tool in Tool::ALL {
        let status = match ctx.tools.locate(tool) {
            Ok(info) => match info.version() {
                Ok(version) => CheckStatus::Ok(format!("{version} ({})", info.path.display())),
                Err(e) => CheckStatus::Warn(format!("{} ({e})", info.path.display())),
            },
            // Poetry backs every operation but lint; the others only disable
            // one operation each.
            Err(e) if tool == Tool::Poetry => CheckStatus::Fail(e.to_string()),
            Err(e) => CheckStatus::Warn(e.to_string()),
        };
        report.push(tool.program(), status);
    }

    check_project(ctx, &mut report);
    report
}

fn check_project(ctx: &Context, report: &mut DoctorReport) {
    let path = ctx.manifest_path();
    if !path.is_file() {
        report.push(
            "pyproject.toml",
            CheckStatus::Fail(format!("not found in {}", ctx.root.display())),
        );
        return;
    }
    let manifest = match Manifest::from_path(&path) {
        Ok(m) => m,
        Err(e) => {
            report.push("pyproject.toml", CheckStatus::Fail(e.to_string()));
            return;
        }
    };

    let meta = match manifest.metadata() {
        Ok(meta) => {
            report.push(
                "project",
                CheckStatus::Ok(format!("{} {}", meta.name, meta.version_string())),
            );
            Some(meta)
        }
        Err(e) => {
            report.push("project", CheckStatus::Fail(e.to_string()));
            None
        }
    };

    report.push(
        "dependencies",
        match manifest.validate_dependencies() {
            Ok(()) => CheckStatus::Ok("all declarations valid".to_owned()),
            Err(e) => CheckStatus::Fail(e.to_string()),
        },
    );

    let scripts = manifest.script_names();
    report.push(
        "scripts",
        if scripts.is_empty() {
            CheckStatus::Warn("none declared; `quay project` and `quay package-install` are unavailable".to_owned())
        } else {
            CheckStatus::Ok(scripts.join(", "))
        },
    );

    let missing: Vec<String> = crate::lint::lint_targets(ctx)
        .into_iter()
        .filter(|p| !p.exists())
        .map(|p| p.display().to_string())
        .collect();
    if !missing.is_empty() {
        report.push(
            "lint-paths",
            CheckStatus::Warn(format!("missing: {}", missing.join(", "))),
        );
    }

    let record_path = ctx.root.join(quay_config::RECORD_PATH);
    match (BuildRecord::from_path(&record_path), meta) {
        (Ok(Some(record)), Some(meta)) if record.is_for_version(&meta.version_string()) => {
            report.push(
                "build record",
                CheckStatus::Ok(format!("{} artifact(s) for {}", record.artifacts.len(), record.version)),
            );
        }
        (Ok(Some(record)), _) => report.push(
            "build record",
            CheckStatus::Warn(format!("records version {}; rebuild to refresh", record.version)),
        ),
        (Ok(None), _) => {}
        (Err(e), _) => report.push("build record", CheckStatus::Warn(e.to_string())),
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::build::{build, BuildOptions};
    use crate::test_support::{Sandbox, POETRY_BUILDS_PROJ, PROJ_MANIFEST};

    fn status<'a>(report: &'a DoctorReport, label: &str) -> Option<&'a CheckStatus> {
        report
            .checks
            .iter()
            .find(|c| c.label == label)
            .map(|c| &c.status)
    }

    #[test]
    fn healthy_project() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.stub(Tool::Poetry, "echo 'Poetry (version 1.8.3)'\nexit 0");
        sb.stub(Tool::Pipx, "echo 1.4.3");
        sb.stub(Tool::Ruff, "echo ruff 0.4.4");

        let report = doctor(&sb.context());
        assert_eq!(report.issues(), 0);
        assert!(matches!(status(&report, "poetry"), Some(CheckStatus::Ok(v)) if v.starts_with("1.8.3")));
        assert_eq!(
            status(&report, "project"),
            Some(&CheckStatus::Ok("proj 2.3.1".to_owned()))
        );
        assert_eq!(
            status(&report, "scripts"),
            Some(&CheckStatus::Ok("proj".to_owned()))
        );
    }

    #[test]
    fn missing_poetry_and_manifest_fail() {
        let sb = Sandbox::empty();
        let report = doctor(&sb.context());
        assert_eq!(report.issues(), 2);
        assert!(matches!(status(&report, "poetry"), Some(CheckStatus::Fail(_))));
        assert!(matches!(status(&report, "pipx"), Some(CheckStatus::Warn(_))));
        assert!(matches!(status(&report, "pyproject.toml"), Some(CheckStatus::Fail(_))));
    }

    #[test]
    fn invalid_metadata_is_reported() {
        let sb = Sandbox::with_manifest("[project]\nname = \"proj\"\nversion = \"one\"\n");
        sb.stub(Tool::Poetry, "echo 'Poetry (version 1.8.3)'");

        let report = doctor(&sb.context());
        assert!(matches!(status(&report, "project"), Some(CheckStatus::Fail(_))));
        assert!(matches!(status(&report, "scripts"), Some(CheckStatus::Warn(_))));
    }

    #[test]
    fn reports_current_build_record() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.stub(Tool::Poetry, POETRY_BUILDS_PROJ);
        build(&sb.context(), &BuildOptions::default()).unwrap();

        let report = doctor(&sb.context());
        assert_eq!(
            status(&report, "build record"),
            Some(&CheckStatus::Ok("2 artifact(s) for 2.3.1".to_owned()))
        );
    }
}

//! Build orchestration: validate metadata, clear stale artifacts, run
//! `poetry build`, record what it produced.

use std::path::{Path, PathBuf};
use std::time::Instant;

use quay_config::{ArtifactKind, BuildRecord, ProjectMetadata};
use quay_config::record::RecordedArtifact;
use quay_tools::{Tool, ToolCommand};
use quay_util::hash::FileDigest;

use crate::dist::{self, format_size};
use crate::error::EngineError;
use crate::project::Context;

/// Options controlling a build invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Arguments forwarded to `poetry build`.
    pub extra_args: Vec<String>,
}

/// One artifact produced by a build.
#[derive(Debug, Clone)]
pub struct BuiltArtifact {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: ArtifactKind,
    pub digest: FileDigest,
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildResult {
    pub name: String,
    pub version: String,
    /// Artifacts for this version, sorted by file name.
    pub artifacts: Vec<BuiltArtifact>,
    /// How long the build took, including bookkeeping.
    pub duration: std::time::Duration,
}

/// Run the build pipeline.
///
/// Steps:
/// 1. Read `pyproject.toml` and validate name and version
/// 2. Resolve Poetry
/// 3. Remove existing artifacts for this name and version, and the build
///    record that describes them
/// 4. Run `poetry build`; on failure remove whatever it left for this version
/// 5. Hash the produced artifacts and write the build record
///
/// Artifacts of other versions are never touched.
///
/// # Errors
/// Returns an error if metadata is invalid, Poetry is missing or fails, the
/// build produces nothing, or the output cannot be hashed or recorded.
pub fn build(ctx: &Context, options: &BuildOptions) -> Result<BuildResult, EngineError> {
    let start = Instant::now();

    let project = ctx.load()?;
    let meta = project.metadata()?;
    let poetry = ctx.tools.locate(Tool::Poetry)?;
    let dist_dir = project.dist_dir();
    let version = meta.version_string();

    let stale = remove_version_artifacts(&dist_dir, &meta)?;
    if !stale.is_empty() {
        eprintln!(
            "    Removing {} previous artifact(s) for {} {version}",
            stale.len(),
            meta.name
        );
    }
    forget_version_record(&project.record_path(), &version)?;

    eprintln!("    Building {} {version}", meta.name);
    let cmd = ToolCommand::poetry_build(&poetry, project.custom_dist_dir())
        .extra_args(&options.extra_args)
        .current_dir(&project.root);
    let code = quay_util::process::run_passthrough(&mut cmd.command())?;

    if code != 0 {
        // A failed build leaves nothing behind for this version.
        match remove_version_artifacts(&dist_dir, &meta) {
            Ok(removed) if !removed.is_empty() => {
                tracing::debug!(?removed, "removed partial artifacts");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "cannot remove partial artifacts"),
        }
        return Err(EngineError::ToolFailed {
            tool: Tool::Poetry,
            command: cmd.display(),
            code,
        });
    }

    let produced = dist::project_artifacts(&dist_dir, &meta)?;
    if produced.is_empty() {
        return Err(EngineError::NoArtifactsProduced {
            name: meta.name.clone(),
            version,
            dir: dist_dir.display().to_string(),
        });
    }

    let mut artifacts = Vec::with_capacity(produced.len());
    for file in produced {
        let Some(kind) = file.artifact().map(|a| a.kind) else {
            continue;
        };
        let digest = quay_util::hash::digest_file(&file.path)?;
        eprintln!(
            "     Created {} ({}, sha256 {})",
            project.relative(&file.path).display(),
            format_size(digest.size),
            digest.short(12)
        );
        artifacts.push(BuiltArtifact {
            path: file.path,
            file_name: file.file_name,
            kind,
            digest,
        });
    }

    let record = BuildRecord {
        name: meta.name.clone(),
        version: version.clone(),
        built_at: now_epoch_secs(),
        artifacts: artifacts
            .iter()
            .map(|a| RecordedArtifact {
                file: a.file_name.clone(),
                kind: a.kind,
                size: a.digest.size,
                sha256: a.digest.sha256.clone(),
            })
            .collect(),
    };
    record.write_to(&project.record_path())?;
    tracing::debug!(path = %project.record_path().display(), "wrote build record");

    Ok(BuildResult {
        name: meta.name,
        version,
        artifacts,
        duration: start.elapsed(),
    })
}

/// Delete every artifact in `dist_dir` for this project version, returning
/// the removed file names.
fn remove_version_artifacts(
    dist_dir: &Path,
    meta: &ProjectMetadata,
) -> Result<Vec<String>, EngineError> {
    let mut removed = Vec::new();
    for file in dist::project_artifacts(dist_dir, meta)? {
        if quay_util::fs::remove_file_if_exists(&file.path)? {
            tracing::debug!(file = %file.file_name, "removed artifact");
            removed.push(file.file_name);
        }
    }
    Ok(removed)
}

/// Delete the build record if it describes `version`. Records of other
/// versions are kept; an unreadable one is left for the next build to replace.
fn forget_version_record(path: &Path, version: &str) -> Result<(), EngineError> {
    match BuildRecord::from_path(path) {
        Ok(Some(record)) if record.is_for_version(version) => {
            quay_util::fs::remove_file_if_exists(path)?;
            tracing::debug!(path = %path.display(), "removed build record");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable build record"),
    }
    Ok(())
}

/// Return the current UTC time as epoch seconds (e.g. "1708646400s-since-epoch").
pub(crate) fn now_epoch_secs() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}s-since-epoch", duration.as_secs())
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::test_support::{Sandbox, POETRY_BUILDS_PROJ, PROJ_MANIFEST};

    #[test]
    fn build_records_both_artifacts() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.stub(Tool::Poetry, POETRY_BUILDS_PROJ);

        let result = build(&sb.context(), &BuildOptions::default()).unwrap();
        assert_eq!(result.name, "proj");
        assert_eq!(result.version, "2.3.1");
        let names: Vec<&str> = result.artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["proj-2.3.1-py3-none-any.whl", "proj-2.3.1.tar.gz"]);
        assert!(names.iter().all(|n| n.contains("proj") && n.contains("2.3.1")));

        let record = BuildRecord::from_path(&sb.root().join(quay_config::RECORD_PATH))
            .unwrap()
            .unwrap();
        assert!(record.is_for_version("2.3.1"));
        assert_eq!(record.artifacts.len(), 2);
        let wheel = record.find("proj-2.3.1-py3-none-any.whl").unwrap();
        assert_eq!(wheel.kind, ArtifactKind::Wheel);
        assert_eq!(wheel.sha256, result.artifacts[0].digest.sha256);
        assert_eq!(sb.calls(Tool::Poetry), vec!["build"]);
    }

    #[test]
    fn rebuild_overwrites_same_version_only() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.write("dist/proj-2.3.1-0-py3-none-any.whl", "stale build tag");
        sb.write("dist/proj-2.3.0.tar.gz", "older release");
        sb.stub(Tool::Poetry, POETRY_BUILDS_PROJ);

        build(&sb.context(), &BuildOptions::default()).unwrap();
        assert_eq!(
            sb.dist_files(),
            vec![
                "proj-2.3.0.tar.gz",
                "proj-2.3.1-py3-none-any.whl",
                "proj-2.3.1.tar.gz"
            ]
        );
    }

    #[test]
    fn missing_version_fails_before_tool_and_leaves_nothing() {
        let sb = Sandbox::with_manifest("[project]\nname = \"proj\"\n");
        sb.stub(Tool::Poetry, POETRY_BUILDS_PROJ);

        let err = build(&sb.context(), &BuildOptions::default()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Precondition);
        assert!(err.to_string().contains("version"));
        assert!(sb.calls(Tool::Poetry).is_empty());
        assert!(sb.dist_files().is_empty());
    }

    #[test]
    fn failed_build_removes_partial_artifacts() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.write("dist/proj-2.2.0.tar.gz", "keep me");
        sb.stub(
            Tool::Poetry,
            "mkdir -p dist\necho partial > dist/proj-2.3.1.tar.gz\nexit 3",
        );

        let err = build(&sb.context(), &BuildOptions::default()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Tool);
        assert_eq!(err.exit_code(), 3);
        assert_eq!(sb.dist_files(), vec!["proj-2.2.0.tar.gz"]);
        assert!(!sb.root().join(quay_config::RECORD_PATH).exists());
    }

    #[test]
    fn failed_rebuild_drops_record_of_deleted_artifacts() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.stub(Tool::Poetry, POETRY_BUILDS_PROJ);
        build(&sb.context(), &BuildOptions::default()).unwrap();
        let record_path = sb.root().join(quay_config::RECORD_PATH);
        assert!(record_path.is_file());

        sb.stub(Tool::Poetry, "exit 3");
        let err = build(&sb.context(), &BuildOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(sb.dist_files().is_empty());
        assert!(BuildRecord::from_path(&record_path).unwrap().is_none());

        let report = crate::doctor::doctor(&sb.context());
        assert!(!report.checks.iter().any(|c| c.label == "build record"));
    }

    #[test]
    fn rebuild_keeps_record_of_other_version() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        let record_path = sb.root().join(quay_config::RECORD_PATH);
        let old = BuildRecord {
            name: "proj".to_owned(),
            version: "2.2.0".to_owned(),
            built_at: now_epoch_secs(),
            artifacts: Vec::new(),
        };
        old.write_to(&record_path).unwrap();

        sb.stub(Tool::Poetry, "exit 1");
        build(&sb.context(), &BuildOptions::default()).unwrap_err();
        let kept = BuildRecord::from_path(&record_path).unwrap().unwrap();
        assert!(kept.is_for_version("2.2.0"));
    }

    #[test]
    fn success_without_output_is_error() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        sb.stub(Tool::Poetry, "exit 0");

        let err = build(&sb.context(), &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::NoArtifactsProduced { .. }));
    }

    #[test]
    fn passthrough_and_custom_dist_dir() {
        let manifest = format!("{PROJ_MANIFEST}\n[tool.quay]\ndist-dir = \"out\"\n");
        let sb = Sandbox::with_manifest(&manifest);
        sb.stub(
            Tool::Poetry,
            "mkdir -p out\necho w > out/proj-2.3.1-py3-none-any.whl",
        );

        let options = BuildOptions {
            extra_args: vec!["--format".to_owned(), "wheel".to_owned()],
        };
        let result = build(&sb.context(), &options).unwrap();
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(
            sb.calls(Tool::Poetry),
            vec!["build --output out --format wheel"]
        );
    }

    #[test]
    fn poetry_missing_is_tool_failure() {
        let sb = Sandbox::with_manifest(PROJ_MANIFEST);
        let err = build(&sb.context(), &BuildOptions::default()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Tool);
        assert!(err.to_string().contains("QUAY_POETRY"));
    }

    #[test]
    fn timestamp_format() {
        assert!(now_epoch_secs().ends_with("s-since-epoch"));
    }
}

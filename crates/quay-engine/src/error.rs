//! Error types for quay-engine.

use std::fmt;

use quay_tools::Tool;

use crate::publish::Violation;

/// Broad class of a failure, deciding how it is reported and which exit code
/// quay returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Manifest, metadata, artifact or entry point missing or malformed;
    /// detected before any tool runs.
    Precondition,
    /// The wrapped tool failed or could not be found.
    Tool,
    /// The managed environment or a filesystem location is inaccessible.
    Environment,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Precondition => "precondition",
            FailureKind::Tool => "tool",
            FailureKind::Environment => "environment",
        })
    }
}

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] quay_util::error::UtilError),

    /// The manifest is missing or invalid.
    #[error("{0}")]
    Manifest(#[from] quay_config::ManifestError),

    /// The build record could not be read or written.
    #[error("{0}")]
    Record(#[from] quay_config::RecordError),

    /// A tool could not be resolved or spawned.
    #[error("{0}")]
    Tool(#[from] quay_tools::ToolError),

    /// The tool ran and exited non-zero.
    #[error("`{command}` failed with exit code {code}")]
    ToolFailed {
        tool: Tool,
        command: String,
        code: i32,
    },

    /// No script could be selected to run.
    #[error("no entry point selected; declared scripts: {} (pass --script or set [tool.quay].entry-point)", list_or_none(.declared))]
    NoEntryPoint { declared: Vec<String> },

    /// The selected script is not declared by the project.
    #[error("entry point `{script}` not found; declared scripts: {} (add it to [project.scripts] or [tool.poetry.scripts])", list_or_none(.declared))]
    EntryPointNotFound {
        script: String,
        declared: Vec<String>,
    },

    /// Poetry has no environment for the project.
    #[error("managed environment missing: {detail} (run `quay install` first)")]
    EnvironmentMissing { detail: String },

    /// `poetry build` succeeded but left nothing behind.
    #[error("build reported success but produced no artifacts for {name} {version} in {dir}")]
    NoArtifactsProduced {
        name: String,
        version: String,
        dir: String,
    },

    /// The output directory holds no artifact for the current version.
    #[error("no artifacts for {name} {version} in {dir} (run `quay build` first)")]
    NoArtifacts {
        name: String,
        version: String,
        dir: String,
    },

    /// No wheel matches the current project and version.
    #[error("no wheel matching {pattern} (run `quay build` first)")]
    NoWheel { pattern: String },

    /// More than one wheel matches.
    #[error("several wheels match {pattern}: {} (remove all but one)", .files.join(", "))]
    AmbiguousWheel { pattern: String, files: Vec<String> },

    /// The project installs no command-line application.
    #[error("{name} declares no console scripts, so there is nothing to install as an application (add [project.scripts])")]
    NoConsoleScripts { name: String },

    /// Local publish validation found violations; the tool was not run.
    #[error("publish validation failed with {} violation(s):\n{}", .violations.len(), render_violations(.violations))]
    PublishRejected { violations: Vec<Violation> },

    /// The linter reported findings.
    #[error("lint found {count} issue(s)")]
    LintFindings { count: usize, code: i32 },
}

impl EngineError {
    /// Which class of failure this is.
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::Manifest(_)
            | EngineError::NoEntryPoint { .. }
            | EngineError::EntryPointNotFound { .. }
            | EngineError::NoArtifacts { .. }
            | EngineError::NoWheel { .. }
            | EngineError::AmbiguousWheel { .. }
            | EngineError::NoConsoleScripts { .. }
            | EngineError::PublishRejected { .. } => FailureKind::Precondition,
            EngineError::Tool(quay_tools::ToolError::Exec(_))
            | EngineError::Io { .. }
            | EngineError::Util(_)
            | EngineError::Record(_)
            | EngineError::EnvironmentMissing { .. } => FailureKind::Environment,
            EngineError::Tool(_)
            | EngineError::ToolFailed { .. }
            | EngineError::NoArtifactsProduced { .. }
            | EngineError::LintFindings { .. } => FailureKind::Tool,
        }
    }

    /// Process exit code: the tool's own status when it ran and failed,
    /// otherwise 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::ToolFailed { code, .. } | EngineError::LintFindings { code, .. }
                if *code != 0 =>
            {
                *code
            }
            _ => 1,
        }
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_owned()
    } else {
        items.join(", ")
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

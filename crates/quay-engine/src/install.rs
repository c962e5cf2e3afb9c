//! Dependency installation into the managed environment.

use quay_tools::{Tool, ToolCommand};

use crate::error::EngineError;
use crate::project::Context;

/// Options for `quay install`.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Arguments forwarded to `poetry install`.
    pub extra_args: Vec<String>,
}

/// Check the manifest and its dependency declarations, then run
/// `poetry install`.
///
/// Resolution, locking and environment creation are Poetry's job; running
/// this twice on an unchanged manifest is a no-op beyond Poetry's own checks.
///
/// # Errors
/// Returns an error if the manifest is missing or invalid, a dependency is
/// malformed, or Poetry is missing or fails.
pub fn install(ctx: &Context, options: &InstallOptions) -> Result<(), EngineError> {
    let project = ctx.load()?;
    project.manifest.validate_dependencies()?;
    let poetry = ctx.tools.locate(Tool::Poetry)?;

    let label = match project.metadata() {
        Ok(meta) => format!("{} {}", meta.name, meta.version_string()),
        Err(_) => project.root.display().to_string(),
    };
    eprintln!("  Installing dependencies for {label}");

    let cmd = ToolCommand::poetry_install(&poetry)
        .extra_args(&options.extra_args)
        .current_dir(&project.root);
    let code = quay_util::process::run_passthrough(&mut cmd.command())?;
    if code != 0 {
        return Err(EngineError::ToolFailed {
            tool: Tool::Poetry,
            command: cmd.display(),
            code,
        });
    }
    Ok(())
}

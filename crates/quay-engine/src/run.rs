//! Run the project's console script inside the managed environment.

use std::path::Path;

use quay_config::Manifest;
use quay_tools::{Tool, ToolCommand, ToolInfo};

use crate::error::EngineError;
use crate::project::Context;

/// Options for `quay project`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Script to run instead of the configured one.
    pub script: Option<String>,
    /// Arguments forwarded to the script.
    pub args: Vec<String>,
}

/// Pick the script to run: the explicit request, then
/// `[tool.quay].entry-point`, then the only declared script.
///
/// # Errors
/// Returns [`EngineError::EntryPointNotFound`] if the chosen name is not
/// declared, or [`EngineError::NoEntryPoint`] if nothing selects a script.
pub fn select_script(manifest: &Manifest, requested: Option<&str>) -> Result<String, EngineError> {
    let declared = manifest.script_names();
    let chosen = requested
        .map(str::to_owned)
        .or_else(|| manifest.settings().entry_point.clone());

    match chosen {
        Some(script) if declared.contains(&script) => Ok(script),
        Some(script) => Err(EngineError::EntryPointNotFound { script, declared }),
        None => match declared.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(EngineError::NoEntryPoint { declared }),
        },
    }
}

/// Run the selected entry point via `poetry run` and return its exit code.
///
/// Arguments and standard streams pass through untouched. A non-zero exit
/// from the script is not an error; the caller exits with it.
///
/// # Errors
/// Returns an error if no script can be selected, Poetry is missing, the
/// managed environment does not exist, or the process cannot be spawned.
pub fn run_project(ctx: &Context, options: &RunOptions) -> Result<i32, EngineError> {
    let project = ctx.load()?;
    let script = select_script(&project.manifest, options.script.as_deref())?;
    let poetry = ctx.tools.locate(Tool::Poetry)?;

    let env = managed_environment(&poetry, &project.root)?;
    tracing::debug!(env = %env, "using managed environment");

    let cmd = ToolCommand::poetry_run(&poetry, &script)
        .extra_args(&options.args)
        .current_dir(&project.root);
    eprintln!("     Running `{}`", cmd.display());
    Ok(quay_util::process::run_passthrough(&mut cmd.command())?)
}

/// Ask Poetry for the project's environment path.
fn managed_environment(poetry: &ToolInfo, root: &Path) -> Result<String, EngineError> {
    let probe = ToolCommand::poetry_env_path(poetry).current_dir(root);
    let output = quay_util::process::run_command(&mut probe.command())?;
    if !output.success {
        let stderr = output.stderr.trim();
        let detail = if stderr.is_empty() {
            format!("`{}` exited with code {}", probe.display(), output.exit_code)
        } else {
            stderr.to_owned()
        };
        return Err(EngineError::EnvironmentMissing { detail });
    }
    let path = output.stdout.trim().to_owned();
    if path.is_empty() || !Path::new(&path).is_dir() {
        return Err(EngineError::EnvironmentMissing {
            detail: format!("environment path `{path}` does not exist"),
        });
    }
    Ok(path)
}

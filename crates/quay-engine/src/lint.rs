//! Static analysis with Ruff.

use std::path::PathBuf;
use std::process::Stdio;

use quay_config::{Manifest, QuaySettings};
use quay_tools::{parse_ruff_json, LintFinding, Tool, ToolCommand, ToolError};

use crate::error::EngineError;
use crate::project::Context;

/// Options for `quay lint`.
#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    /// Arguments forwarded to `ruff check`.
    pub extra_args: Vec<String>,
}

/// Result of a clean lint run.
#[derive(Debug)]
pub struct LintReport {
    /// Findings printed (non-empty only when the operator passed
    /// `--exit-zero` or similar through to Ruff).
    pub findings: Vec<LintFinding>,
    /// Which executable ran Ruff.
    pub launcher: Tool,
}

/// Run `ruff check` over the configured paths and print each finding once
/// as `file:line:col: CODE message` on stdout.
///
/// Ruff is used directly when it resolves; otherwise it runs through
/// `poetry run` if the project has a manifest. Output that is not Ruff's JSON
/// report is printed verbatim.
///
/// # Errors
/// Returns [`EngineError::LintFindings`] when Ruff reports findings, or a
/// tool error when Ruff is unavailable or fails; both carry Ruff's status.
pub fn lint(ctx: &Context, options: &LintOptions) -> Result<LintReport, EngineError> {
    let settings = settings(ctx);
    let cmd = launcher(ctx, &settings.lint_paths)?
        .extra_args(&options.extra_args)
        .current_dir(&ctx.root);

    eprintln!("     Linting {}", settings.lint_paths.join(" "));
    let mut command = cmd.command();
    command.stdin(Stdio::null()).stderr(Stdio::inherit());
    let output = quay_util::process::run_command(&mut command)?;

    let findings = match parse_ruff_json(&output.stdout) {
        Ok(findings) => findings,
        Err(e) => {
            tracing::debug!(error = %e, "linter output is not a JSON report");
            print!("{}", output.stdout);
            if output.exit_code != 0 {
                return Err(EngineError::ToolFailed {
                    tool: cmd.tool(),
                    command: cmd.display(),
                    code: output.exit_code,
                });
            }
            return Ok(LintReport {
                findings: Vec::new(),
                launcher: cmd.tool(),
            });
        }
    };

    let root = ctx.root.canonicalize().unwrap_or_else(|_| ctx.root.clone());
    for finding in &findings {
        println!("{}", finding.render(&root));
    }

    if output.exit_code != 0 {
        if findings.is_empty() {
            return Err(EngineError::ToolFailed {
                tool: cmd.tool(),
                command: cmd.display(),
                code: output.exit_code,
            });
        }
        return Err(EngineError::LintFindings {
            count: findings.len(),
            code: output.exit_code,
        });
    }

    Ok(LintReport {
        findings,
        launcher: cmd.tool(),
    })
}

/// `[tool.quay]` settings when a readable manifest exists, defaults otherwise.
fn settings(ctx: &Context) -> QuaySettings {
    let path = ctx.manifest_path();
    if !path.is_file() {
        return QuaySettings::default();
    }
    match Manifest::from_path(&path) {
        Ok(manifest) => manifest.settings().clone(),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable manifest for lint settings");
            QuaySettings::default()
        }
    }
}

fn launcher(ctx: &Context, paths: &[String]) -> Result<ToolCommand, EngineError> {
    match ctx.tools.locate(Tool::Ruff) {
        Ok(ruff) => Ok(ToolCommand::ruff_check(&ruff, paths)),
        Err(not_found @ ToolError::NotFound { .. }) => {
            let poetry = ctx
                .manifest_path()
                .is_file()
                .then(|| ctx.tools.find(Tool::Poetry))
                .flatten();
            match poetry {
                Some(poetry) => {
                    tracing::debug!("ruff not on PATH; running it through poetry");
                    Ok(ToolCommand::ruff_check_via_poetry(&poetry, paths))
                }
                None => Err(not_found.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Paths Ruff will scan, resolved against the project root.
pub fn lint_targets(ctx: &Context) -> Vec<PathBuf> {
    settings(ctx)
        .lint_paths
        .iter()
        .map(|p| ctx.root.join(p))
        .collect()
}

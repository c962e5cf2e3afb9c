//! Tool invocation and lint finding normalization.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::detect::{Tool, ToolInfo};

/// Builder for one invocation of an external tool.
///
/// Arguments are laid out as `<program> <base> <extra> <enforced> <operands>`:
/// `extra` carries operator passthrough arguments and `enforced` carries flags
/// quay always adds, so passthrough can never displace them. A bare `--` in
/// the passthrough is kept after the enforced flags so they stay options.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    tool: Tool,
    program: PathBuf,
    base: Vec<String>,
    extra: Vec<String>,
    enforced: Vec<String>,
    operands: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    fn new(info: &ToolInfo, base: &[&str]) -> Self {
        Self {
            tool: info.tool,
            program: info.path.clone(),
            base: base.iter().map(|s| (*s).to_owned()).collect(),
            extra: Vec::new(),
            enforced: Vec::new(),
            operands: Vec::new(),
            cwd: None,
        }
    }

    /// `poetry install`
    pub fn poetry_install(poetry: &ToolInfo) -> Self {
        Self::new(poetry, &["install"])
    }

    /// `poetry env info --path`: prints the project environment, fails if
    /// none exists.
    pub fn poetry_env_path(poetry: &ToolInfo) -> Self {
        Self::new(poetry, &["env", "info", "--path"])
    }

    /// `poetry run <script> [args...]`
    pub fn poetry_run(poetry: &ToolInfo, script: &str) -> Self {
        Self::new(poetry, &["run", script])
    }

    /// `poetry build [--output <dir>]`
    ///
    /// `output` is only passed for a non-default output directory.
    pub fn poetry_build(poetry: &ToolInfo, output: Option<&Path>) -> Self {
        let mut cmd = Self::new(poetry, &["build"]);
        if let Some(dir) = output {
            cmd.base.push("--output".to_owned());
            cmd.base.push(dir.display().to_string());
        }
        cmd
    }

    /// `poetry publish [--dist-dir <dir>] [--repository <name>] [args...] --dry-run`
    ///
    /// `--dry-run` is always present; quay never uploads.
    pub fn poetry_publish_dry_run(
        poetry: &ToolInfo,
        dist_dir: Option<&Path>,
        repository: Option<&str>,
    ) -> Self {
        let mut cmd = Self::new(poetry, &["publish"]);
        if let Some(dir) = dist_dir {
            cmd.base.push("--dist-dir".to_owned());
            cmd.base.push(dir.display().to_string());
        }
        if let Some(repo) = repository {
            cmd.base.push("--repository".to_owned());
            cmd.base.push(repo.to_owned());
        }
        cmd.enforced.push("--dry-run".to_owned());
        cmd
    }

    /// `pipx install [args...] --force <wheel>`
    ///
    /// `--force` is always present so a reinstall replaces the previous one.
    pub fn pipx_install(pipx: &ToolInfo, wheel: &Path) -> Self {
        let mut cmd = Self::new(pipx, &["install"]);
        cmd.enforced.push("--force".to_owned());
        cmd.operands.push(wheel.display().to_string());
        cmd
    }

    /// `ruff check [args...] --output-format json --no-fix <paths...>`
    ///
    /// `--no-fix` overrides a `fix = true` Ruff config; lint never edits sources.
    pub fn ruff_check(ruff: &ToolInfo, paths: &[String]) -> Self {
        let mut cmd = Self::new(ruff, &["check"]);
        cmd.enforced = ruff_report_flags();
        cmd.operands = paths.to_vec();
        cmd
    }

    /// `poetry run ruff check [args...] --output-format json --no-fix <paths...>`,
    /// for Ruff installed only inside the project environment.
    pub fn ruff_check_via_poetry(poetry: &ToolInfo, paths: &[String]) -> Self {
        let mut cmd = Self::new(poetry, &["run", "ruff", "check"]);
        cmd.enforced = ruff_report_flags();
        cmd.operands = paths.to_vec();
        cmd
    }

    /// Append operator passthrough arguments.
    #[must_use]
    pub fn extra_args(mut self, args: &[String]) -> Self {
        self.extra.extend(args.iter().cloned());
        self
    }

    /// Run the tool from `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// The tool being invoked.
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Build the argument list (without the program).
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(
            self.base.len() + self.extra.len() + self.enforced.len() + self.operands.len(),
        );
        let split = self
            .extra
            .iter()
            .position(|a| a == "--")
            .unwrap_or(self.extra.len());
        let (options, positionals) = self.extra.split_at(split);
        args.extend(self.base.iter().cloned());
        args.extend(options.iter().cloned());
        args.extend(self.enforced.iter().cloned());
        args.extend(positionals.iter().cloned());
        args.extend(self.operands.iter().cloned());
        args
    }

    /// A ready-to-spawn [`Command`].
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Shell-like rendering using the bare program name.
    pub fn display(&self) -> String {
        let mut parts = vec![self.tool.program().to_owned()];
        parts.extend(self.build_args());
        parts.join(" ")
    }
}

fn ruff_report_flags() -> Vec<String> {
    vec![
        "--output-format".to_owned(),
        "json".to_owned(),
        "--no-fix".to_owned(),
    ]
}

/// One finding reported by `ruff check --output-format json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    /// Rule code, e.g. `F401`. Syntax errors carry none.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// File path as reported by Ruff (usually absolute).
    pub file: PathBuf,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl LintFinding {
    /// Render as `file:line:col: CODE message`, with `file` shown relative to
    /// `root` when it lies beneath it.
    pub fn render(&self, root: &Path) -> String {
        let file = self.file.strip_prefix(root).unwrap_or(&self.file);
        let code = self.code.as_deref().unwrap_or("E999");
        format!(
            "{}:{}:{}: {code} {}",
            file.display(),
            self.line,
            self.column,
            self.message
        )
    }
}

#[derive(Deserialize)]
struct RawFinding {
    code: Option<String>,
    message: String,
    filename: PathBuf,
    location: Option<RawLocation>,
}

#[derive(Deserialize)]
struct RawLocation {
    row: u32,
    column: u32,
}

/// Parse Ruff's JSON report into findings, sorted by file, line and column,
/// with exact duplicates removed.
///
/// # Errors
/// Returns the JSON error if `stdout` is not a Ruff JSON report.
pub fn parse_ruff_json(stdout: &str) -> Result<Vec<LintFinding>, serde_json::Error> {
    let raw: Vec<RawFinding> = serde_json::from_str(stdout.trim())?;
    let mut findings: Vec<LintFinding> = raw
        .into_iter()
        .map(|f| {
            let (line, column) = f.location.map_or((1, 1), |l| (l.row, l.column));
            LintFinding {
                code: f.code,
                message: f.message,
                file: f.filename,
                line,
                column,
            }
        })
        .collect();
    findings.sort_by(|a, b| {
        (&a.file, a.line, a.column, &a.code, &a.message)
            .cmp(&(&b.file, b.line, b.column, &b.code, &b.message))
    });
    findings.dedup();
    Ok(findings)
}

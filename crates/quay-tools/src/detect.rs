//! Tool detection and version parsing.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ToolError;

/// An external program quay delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    /// Dependency manager, builder and publisher.
    Poetry,
    /// Standalone application installer.
    Pipx,
    /// Linter.
    Ruff,
}

impl Tool {
    /// Every tool, in the order `quay doctor` reports them.
    pub const ALL: [Tool; 3] = [Tool::Poetry, Tool::Pipx, Tool::Ruff];

    /// Executable name looked up on `PATH`.
    pub fn program(self) -> &'static str {
        match self {
            Tool::Poetry => "poetry",
            Tool::Pipx => "pipx",
            Tool::Ruff => "ruff",
        }
    }

    /// Environment variable that overrides `PATH` lookup.
    pub fn env_var(self) -> &'static str {
        match self {
            Tool::Poetry => "QUAY_POETRY",
            Tool::Pipx => "QUAY_PIPX",
            Tool::Ruff => "QUAY_RUFF",
        }
    }

    fn install_hint(self) -> &'static str {
        match self {
            Tool::Poetry => "https://python-poetry.org/docs/#installation",
            Tool::Pipx => "`python3 -m pip install --user pipx`",
            Tool::Ruff => "`poetry add --group dev ruff`",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// A resolved tool binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub tool: Tool,
    /// Absolute path to the binary.
    pub path: PathBuf,
}

impl ToolInfo {
    /// Run `<tool> --version` and extract the version number.
    ///
    /// # Errors
    /// Returns an error if the tool cannot be executed or prints no version.
    pub fn version(&self) -> Result<String, ToolError> {
        let output = quay_util::process::run_command(Command::new(&self.path).arg("--version"))?;
        let raw = if output.stdout.trim().is_empty() {
            output.stderr.trim().to_owned()
        } else {
            output.stdout.trim().to_owned()
        };
        parse_version(&raw).ok_or(ToolError::VersionParse {
            tool: self.tool,
            output: raw,
        })
    }
}

/// Resolves tool binaries.
///
/// Resolution order per tool:
/// 1. An explicit override (from [`ToolLocator::with_override`] or the
///    tool's `QUAY_*` environment variable)
/// 2. `PATH` lookup (or the search path given to [`ToolLocator::with_search_path`])
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    overrides: BTreeMap<Tool, PathBuf>,
    search_path: Option<OsString>,
}

impl ToolLocator {
    /// A locator honouring `QUAY_POETRY`, `QUAY_PIPX` and `QUAY_RUFF`.
    pub fn from_env() -> Self {
        let mut locator = Self::default();
        for tool in Tool::ALL {
            if let Some(value) = std::env::var_os(tool.env_var()).filter(|v| !v.is_empty()) {
                locator.overrides.insert(tool, PathBuf::from(value));
            }
        }
        locator
    }

    /// Pin `tool` to an explicit binary.
    #[must_use]
    pub fn with_override(mut self, tool: Tool, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(tool, path.into());
        self
    }

    /// Search these directories instead of the process `PATH`.
    #[must_use]
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Resolve a tool to an executable path.
    ///
    /// # Errors
    /// Returns an error if an override points nowhere, the tool is not on the
    /// search path, or the binary is not executable.
    pub fn locate(&self, tool: Tool) -> Result<ToolInfo, ToolError> {
        let path = if let Some(path) = self.overrides.get(&tool) {
            if !path.exists() {
                return Err(ToolError::OverrideMissing {
                    env_var: tool.env_var(),
                    path: path.clone(),
                });
            }
            path.clone()
        } else {
            self.search(tool)?
        };
        check_executable(tool, &path)?;
        tracing::debug!(%tool, path = %path.display(), "resolved tool");
        Ok(ToolInfo { tool, path })
    }

    /// Like [`ToolLocator::locate`], but absence is not an error.
    pub fn find(&self, tool: Tool) -> Option<ToolInfo> {
        self.locate(tool).ok()
    }

    fn search(&self, tool: Tool) -> Result<PathBuf, ToolError> {
        let not_found = || ToolError::NotFound {
            tool,
            hint: tool.install_hint(),
            env_var: tool.env_var(),
        };
        let found = match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(tool.program(), Some(paths), cwd)
            }
            None => which::which(tool.program()),
        };
        found.map_err(|_| not_found())
    }
}

/// Parse a version number from raw `--version` output.
///
/// Handles formats like:
/// - `Poetry (version 1.8.3)`
/// - `ruff 0.4.4`
/// - `1.4.3`
pub fn parse_version(raw: &str) -> Option<String> {
    raw.split_whitespace()
        .map(|token| token.trim_matches(|c: char| matches!(c, '(' | ')' | ',')))
        .map(|token| token.trim_start_matches('v'))
        .find(|token| is_version_like(token))
        .map(str::to_owned)
}

fn is_version_like(s: &str) -> bool {
    let mut parts = s.split('.');
    let Some(major) = parts.next() else {
        return false;
    };
    let Some(minor) = parts.next() else {
        return false;
    };
    let digits = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    // Later components may carry suffixes such as `0b1` or `0.dev0`.
    let minor_head: String = minor.chars().take_while(char::is_ascii_digit).collect();
    digits(major) && digits(&minor_head)
}

fn check_executable(tool: Tool, path: &Path) -> Result<(), ToolError> {
    let metadata = std::fs::metadata(path).map_err(|_| ToolError::NotExecutable {
        tool,
        path: path.to_path_buf(),
    })?;
    if !metadata.is_file() {
        return Err(ToolError::NotExecutable {
            tool,
            path: path.to_path_buf(),
        });
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ToolError::NotExecutable {
                tool,
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}
